//! Expiry watcher: periodic validity check of the active session.
//!
//! DESIGN
//! ======
//! While a session is authenticated, a background task wakes every
//! `check_interval`, checks the token's local expiry first (no round-trip),
//! then asks the provider to `verify` it. A token the provider rejects ends
//! the session through the same apply path as every other change.
//!
//! TRADE-OFFS
//! ==========
//! A check that cannot reach the provider leaves the session as it was:
//! stale but consistent beats signing a user out because of a network blip.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::error::AuthError;
use crate::gateway::WeakGateway;
use crate::provider::IdentityProvider;
use crate::token::{is_expired_at, now_secs, seconds_until_expiry_at};

/// Why a session was judged over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryCause {
    /// The token's own `exp` claim has passed.
    LocallyExpired,
    /// The provider no longer accepts the token.
    Rejected,
}

/// Outcome of one validity check.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCheck {
    /// There is no token to check.
    NoSession,
    Valid,
    Expired(ExpiryCause),
    /// The provider could not be asked; the session is left alone.
    Unverified(AuthError),
}

/// Check a token once: local expiry, then the provider's verdict.
pub async fn check_session(
    provider: &dyn IdentityProvider,
    token: Option<&str>,
    now: u64,
    expiry_warning_secs: u64,
) -> SessionCheck {
    let Some(token) = token else {
        return SessionCheck::NoSession;
    };

    if is_expired_at(token, now) {
        return SessionCheck::Expired(ExpiryCause::LocallyExpired);
    }

    let remaining = seconds_until_expiry_at(token, now);
    if remaining > 0 && remaining < expiry_warning_secs {
        warn!(remaining_secs = remaining, "session token close to expiry");
    }

    match provider.verify(token).await {
        Ok(true) => SessionCheck::Valid,
        Ok(false) => SessionCheck::Expired(ExpiryCause::Rejected),
        Err(e) if e.is_unauthorized() => SessionCheck::Expired(ExpiryCause::Rejected),
        Err(e) => SessionCheck::Unverified(e),
    }
}

/// Spawn the watcher for the gateway's current session. It exits on its own
/// once the session ends or the gateway is dropped.
pub(crate) fn spawn_expiry_watcher(gateway: WeakGateway, config: &GatewayConfig) -> JoinHandle<()> {
    let interval = config.check_interval.max(Duration::from_millis(1));
    let warning_secs = config.expiry_warning_secs;
    debug!(interval_secs = interval.as_secs(), "expiry watcher started");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; the session was just confirmed.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(gateway) = gateway.upgrade() else {
                break;
            };
            let token = gateway.current_token();

            match check_session(gateway.provider(), token.as_deref(), now_secs(), warning_secs).await {
                SessionCheck::Valid => {}
                SessionCheck::NoSession => break,
                SessionCheck::Expired(cause) => {
                    info!(?cause, "session no longer valid");
                    // A refresh may have swapped the token meanwhile; the next
                    // tick then checks the new one.
                    if let Some(token) = token {
                        gateway.expire(token).await;
                    }
                }
                SessionCheck::Unverified(e) => {
                    warn!(error = %e, code = e.error_code(), "session check could not reach provider");
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "watcher_test.rs"]
mod tests;
