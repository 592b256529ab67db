//! Identity provider boundary and session-change notifications.
//!
//! ARCHITECTURE
//! ============
//! The provider is a black box reached through [`IdentityProvider`]. It owns
//! accounts and tokens; the gateway owns the local view of the session.
//! Providers push out-of-band changes (refresh, expiry, sign-out elsewhere)
//! through a [`SessionNotifier`], whose listeners hold a [`Subscription`]
//! that unregisters on drop so a torn-down gateway cannot leak a listener.
//!
//! Delivery is at-least-once and may repeat; consumers must be idempotent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::mpsc;

use crate::error::AuthError;
use crate::identity::{AuthSession, Credentials, Identity, SignUpOutcome};

// =============================================================================
// EVENTS
// =============================================================================

/// Out-of-band session change reported by the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A session was established outside the gateway's own calls.
    SignedIn(AuthSession),
    /// The current session's token was replaced.
    TokenRefreshed(AuthSession),
    /// The signed-in user's record changed.
    UserUpdated(Identity),
    /// The session was terminated.
    SignedOut,
    /// The session's token is no longer valid.
    Expired,
}

/// Receiving half of a subscription.
pub type SessionEvents = mpsc::UnboundedReceiver<SessionEvent>;

// =============================================================================
// PROVIDER TRAIT
// =============================================================================

#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Request a new session for the given credentials.
    ///
    /// # Errors
    ///
    /// Returns the provider's [`AuthError`] verbatim.
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<AuthSession, AuthError>;

    /// Request account creation. A session may or may not come back.
    ///
    /// # Errors
    ///
    /// Returns the provider's [`AuthError`] verbatim.
    async fn sign_up_with_password(&self, credentials: &Credentials) -> Result<SignUpOutcome, AuthError>;

    /// Terminate the session identified by `access_token`. With no token
    /// there is nothing to terminate and providers should succeed.
    ///
    /// # Errors
    ///
    /// Returns the provider's [`AuthError`] verbatim.
    async fn sign_out(&self, access_token: Option<&str>) -> Result<(), AuthError>;

    /// Resolve the identity behind an existing token.
    ///
    /// # Errors
    ///
    /// [`AuthError::Unauthorized`] when the token is no longer accepted.
    async fn get_user(&self, access_token: &str) -> Result<Identity, AuthError>;

    /// Ask the provider whether the token is still valid.
    ///
    /// # Errors
    ///
    /// [`AuthError::Unauthorized`] when the token is no longer accepted, or a
    /// transport error when the provider could not be asked.
    async fn verify(&self, access_token: &str) -> Result<bool, AuthError>;

    /// Register for session-change notifications.
    fn subscribe(&self) -> (Subscription, SessionEvents);
}

// =============================================================================
// NOTIFIER
// =============================================================================

#[derive(Default)]
struct Listeners {
    next_id: u64,
    senders: HashMap<u64, mpsc::UnboundedSender<SessionEvent>>,
}

/// Fan-out of [`SessionEvent`]s to registered listeners.
#[derive(Clone, Default)]
pub struct SessionNotifier {
    listeners: Arc<Mutex<Listeners>>,
}

impl SessionNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Listeners> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a listener. Events flow until the [`Subscription`] is dropped.
    #[must_use]
    pub fn subscribe(&self) -> (Subscription, SessionEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut listeners = self.lock();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.senders.insert(id, tx);
        let sub = Subscription { id, listeners: Some(Arc::downgrade(&self.listeners)) };
        (sub, rx)
    }

    /// Deliver an event to every live listener. Returns how many received it.
    pub fn notify(&self, event: &SessionEvent) -> usize {
        let mut listeners = self.lock();
        listeners.senders.retain(|_, tx| tx.send(event.clone()).is_ok());
        listeners.senders.len()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.lock().senders.len()
    }
}

/// Handle for a registered listener. Dropping it unregisters.
#[must_use = "dropping a Subscription unregisters the listener immediately"]
pub struct Subscription {
    id: u64,
    listeners: Option<Weak<Mutex<Listeners>>>,
}

impl Subscription {
    /// Unregister explicitly.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if let Some(listeners) = self.listeners.take().and_then(|w| w.upgrade()) {
            listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .senders
                .remove(&self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("attached", &self.listeners.is_some())
            .finish()
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "provider_test.rs"]
mod tests;
