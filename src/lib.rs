//! Session authentication gateway for the admin portal.
//!
//! ARCHITECTURE
//! ============
//! ```text
//!   caller ──sign_in/sign_up/sign_out──▶ SessionGateway ──▶ IdentityProvider
//!      ▲                                   │      ▲              │
//!      └──── watch::Receiver<Session> ◀────┘      └─SessionEvent─┘
//!                                          │
//!                                          ├──▶ TokenStore (persisted token)
//!                                          └──▶ expiry watcher (while signed in)
//! ```
//!
//! The gateway is the only writer of the session. The provider is a black
//! box behind [`provider::IdentityProvider`]; [`http::HttpIdentityProvider`]
//! speaks the portal backend's REST auth API.

pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod identity;
pub mod provider;
pub mod session;
pub mod store;
pub mod token;
pub mod watcher;

pub use config::{ConfigError, GatewayConfig};
pub use error::AuthError;
pub use gateway::SessionGateway;
pub use http::HttpIdentityProvider;
pub use identity::{AccessToken, AuthSession, Credentials, Identity, SignUpOutcome};
pub use provider::{IdentityProvider, SessionEvent, SessionNotifier, Subscription};
pub use session::{Session, SessionPhase};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use token::SessionCountdown;
