//! Session authentication gateway.
//!
//! ARCHITECTURE
//! ============
//! `SessionGateway` is the single writer of session state. Callers drive it
//! with `sign_in`/`sign_up`/`sign_out`; the provider drives it with pushed
//! [`SessionEvent`]s. Both paths funnel into one `apply` step that checks the
//! ticket, persists the token, and publishes the new [`Session`] through a
//! `watch` channel.
//!
//! LIFECYCLE
//! =========
//! `new` → `initialize` (once, before first use) → ... → `shutdown`.
//! The gateway is a cheap `Clone` handle meant to be passed explicitly to
//! whatever needs it; there is no global instance.
//!
//! ERROR HANDLING
//! ==============
//! Operations return the provider's error as a value and never retry. Every
//! operation holds an in-flight guard whose drop lowers the loading flag, so
//! no path (including a dropped future) can leave it stuck on.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::error::AuthError;
use crate::identity::{AccessToken, AuthSession, Credentials, Identity, SignUpOutcome};
use crate::provider::{IdentityProvider, SessionEvent, SessionEvents, Subscription};
use crate::session::{Ledger, Session};
use crate::store::TokenStore;
use crate::token::{SessionCountdown, is_expired_at, now_secs};
use crate::watcher;

// =============================================================================
// GATEWAY
// =============================================================================

/// Handle to the process-wide session. Clones share the same state.
#[derive(Clone)]
pub struct SessionGateway {
    inner: Arc<Inner>,
}

struct Inner {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn TokenStore>,
    config: GatewayConfig,
    ledger: Mutex<Ledger>,
    state: watch::Sender<Session>,
    /// Serializes `apply` so check, persist and publish happen as one step.
    apply_lock: tokio::sync::Mutex<()>,
    background: Mutex<Background>,
}

#[derive(Default)]
struct Background {
    initialized: bool,
    subscription: Option<Subscription>,
    pump: Option<JoinHandle<()>>,
    watcher: Option<JoinHandle<()>>,
}

impl Background {
    fn stop_watcher(&mut self) {
        if let Some(handle) = self.watcher.take() {
            handle.abort();
        }
    }
}

/// Non-owning handle used by background tasks so they never keep a
/// torn-down gateway alive.
#[derive(Clone)]
pub(crate) struct WeakGateway(Weak<Inner>);

impl WeakGateway {
    pub(crate) fn upgrade(&self) -> Option<SessionGateway> {
        self.0.upgrade().map(|inner| SessionGateway { inner })
    }
}

/// What `apply` did with a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Applied {
    Changed,
    /// Accepted, but the session already looked like that.
    Unchanged,
    /// A later result had already been applied, or the gateway is shut down.
    Superseded,
}

/// What a settled result does to the session.
enum Change {
    /// A session was established or its token replaced.
    Session(AuthSession),
    /// The signed-in user's record changed; ignored when signed out.
    User(Identity),
    /// The session ended.
    Cleared,
    /// The session ended, but only if `token` is still the current one.
    Expired { token: String },
}

impl SessionGateway {
    /// Build a gateway in the `Unresolved` state. Nothing touches the
    /// provider until [`SessionGateway::initialize`].
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, store: Arc<dyn TokenStore>, config: GatewayConfig) -> Self {
        let (state, _) = watch::channel(Session::unresolved());
        Self {
            inner: Arc::new(Inner {
                provider,
                store,
                config,
                ledger: Mutex::new(Ledger::default()),
                state,
                apply_lock: tokio::sync::Mutex::new(()),
                background: Mutex::new(Background::default()),
            }),
        }
    }

    // =========================================================================
    // OBSERVERS
    // =========================================================================

    /// Snapshot of the whole session record.
    #[must_use]
    pub fn session(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<Identity> {
        self.inner.state.borrow().current_user.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }

    /// Receiver that is woken on every published change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// Remaining lifetime of the current token.
    #[must_use]
    pub fn time_remaining(&self) -> SessionCountdown {
        let token = self.current_token();
        SessionCountdown::now(token.as_deref(), self.inner.config.expiring_soon_secs)
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    pub(crate) fn provider(&self) -> &dyn IdentityProvider {
        self.inner.provider.as_ref()
    }

    pub(crate) fn current_token(&self) -> Option<String> {
        self.ledger().token.clone()
    }

    pub(crate) fn downgrade(&self) -> WeakGateway {
        WeakGateway(Arc::downgrade(&self.inner))
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Resolve the initial session and start listening for provider changes.
    ///
    /// A stored token is restored if it is not locally expired and the
    /// provider still accepts it; a rejected or expired token is cleared.
    /// Calling this again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the provider or storage error that prevented confirming a
    /// stored token. The gateway is resolved (as `Anonymous`) either way.
    pub async fn initialize(&self) -> Result<(), AuthError> {
        {
            let mut bg = self.background();
            if bg.initialized {
                return Ok(());
            }
            bg.initialized = true;
            let (subscription, events) = self.inner.provider.subscribe();
            bg.subscription = Some(subscription);
            bg.pump = Some(spawn_event_pump(self.downgrade(), events));
        }

        let op = self.begin();
        let result = self.restore(op.ticket).await;

        {
            let mut ledger = self.ledger();
            ledger.resolved = true;
            self.publish(&ledger);
        }

        match &result {
            Ok(()) => info!(authenticated = self.session().is_authenticated(), "session resolved"),
            Err(e) => warn!(error = %e, code = e.error_code(), "session restore failed"),
        }
        result
    }

    async fn restore(&self, ticket: u64) -> Result<(), AuthError> {
        let Some(token) = self.inner.store.load().await? else {
            debug!("no stored token");
            return Ok(());
        };

        if is_expired_at(&token, now_secs()) {
            info!("stored token expired, discarding");
            return self.inner.store.clear().await;
        }

        match self.inner.provider.get_user(&token).await {
            Ok(user) => {
                let session = AuthSession { user, token: AccessToken::bearer(token) };
                self.adopt(ticket, session).await;
                Ok(())
            }
            Err(e) if e.is_unauthorized() => {
                info!("stored token rejected by provider, discarding");
                self.inner.store.clear().await
            }
            Err(e) => Err(e),
        }
    }

    /// Stop background work and reset to signed-out, not loading.
    ///
    /// The stored token is left in place; teardown is not sign-out. Results
    /// of operations still in flight are discarded.
    pub async fn shutdown(&self) {
        {
            let mut bg = self.background();
            bg.stop_watcher();
            if let Some(sub) = bg.subscription.take() {
                sub.unsubscribe();
            }
            if let Some(pump) = bg.pump.take() {
                pump.abort();
            }
        }

        let _serial = self.inner.apply_lock.lock().await;
        let mut ledger = self.ledger();
        ledger.closed = true;
        ledger.resolved = true;
        ledger.set_session(None, None);
        self.publish(&ledger);
        info!("session gateway shut down");
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// Request a new session. Exactly one provider round-trip.
    ///
    /// # Errors
    ///
    /// Returns the provider's [`AuthError`] verbatim; the session is unchanged.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let op = self.begin();
        let credentials = Credentials::new(email, password);

        match self.inner.provider.sign_in_with_password(&credentials).await {
            Ok(session) => {
                info!(user_id = %session.user.id, "sign-in succeeded");
                self.adopt(op.ticket, session).await;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "sign-in failed");
                Err(e)
            }
        }
    }

    /// Request account creation. A session is applied only if the provider
    /// opened one.
    ///
    /// # Errors
    ///
    /// Returns the provider's [`AuthError`] verbatim; the session is unchanged.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<SignUpOutcome, AuthError> {
        let op = self.begin();
        let credentials = Credentials::new(email, password).with_full_name(full_name.map(str::to_owned));

        match self.inner.provider.sign_up_with_password(&credentials).await {
            Ok(SignUpOutcome::SignedIn(session)) => {
                info!(user_id = %session.user.id, "sign-up succeeded");
                self.adopt(op.ticket, session.clone()).await;
                Ok(SignUpOutcome::SignedIn(session))
            }
            Ok(outcome @ SignUpOutcome::ConfirmationRequired(_)) => {
                info!("sign-up accepted, confirmation pending");
                Ok(outcome)
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "sign-up failed");
                Err(e)
            }
        }
    }

    /// Terminate the current session. Signing out while anonymous succeeds
    /// and leaves the session anonymous, as does signing out a token the
    /// provider already rejects.
    ///
    /// # Errors
    ///
    /// Returns the provider's [`AuthError`] verbatim; the session is unchanged.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let op = self.begin();
        let token = self.current_token();

        match self.inner.provider.sign_out(token.as_deref()).await {
            Ok(()) => {
                info!("sign-out succeeded");
                self.apply(op.ticket, Change::Cleared).await;
                Ok(())
            }
            Err(e) if e.is_unauthorized() => {
                info!(status = e.status(), "token already invalid, signing out locally");
                self.apply(op.ticket, Change::Cleared).await;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "sign-out failed");
                Err(e)
            }
        }
    }

    // =========================================================================
    // NOTIFICATIONS
    // =========================================================================

    /// Fold a provider notification into the session. Redundant deliveries
    /// publish nothing.
    pub(crate) async fn handle_event(&self, event: SessionEvent) {
        let stamp = self.ledger().stamp();
        let change = match event {
            SessionEvent::SignedIn(session) | SessionEvent::TokenRefreshed(session) => Change::Session(session),
            SessionEvent::UserUpdated(user) => Change::User(user),
            SessionEvent::SignedOut | SessionEvent::Expired => Change::Cleared,
        };
        self.apply(stamp, change).await;
    }

    /// End the session if `token` is still the one in use.
    pub(crate) async fn expire(&self, token: String) {
        let stamp = self.ledger().stamp();
        self.apply(stamp, Change::Expired { token }).await;
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.inner.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn background(&self) -> MutexGuard<'_, Background> {
        self.inner.background.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish the ledger's projection if it differs from what observers have.
    fn publish(&self, ledger: &Ledger) {
        let next = ledger.snapshot();
        self.inner.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    fn begin(&self) -> InFlight<'_> {
        let mut ledger = self.ledger();
        let ticket = ledger.begin();
        self.publish(&ledger);
        InFlight { gateway: self, ticket }
    }

    /// Apply a session the provider opened for one of our operations. If a
    /// later result already won, the session is revoked instead so it does
    /// not outlive the local state.
    async fn adopt(&self, ticket: u64, session: AuthSession) {
        let token = session.token.access_token.clone();
        if self.apply(ticket, Change::Session(session)).await != Applied::Superseded {
            return;
        }
        match self.inner.provider.sign_out(Some(&token)).await {
            Ok(()) => info!(ticket, "revoked superseded session"),
            Err(e) if e.is_unauthorized() => debug!(ticket, "superseded session already invalid"),
            Err(e) => warn!(error = %e, code = e.error_code(), "could not revoke superseded session"),
        }
    }

    /// Apply a settled result.
    async fn apply(&self, ticket: u64, change: Change) -> Applied {
        let _serial = self.inner.apply_lock.lock().await;

        let (current_token, current_user) = {
            let ledger = self.ledger();
            if !ledger.accepts(ticket) {
                debug!(ticket, "discarding superseded result");
                return Applied::Superseded;
            }
            (ledger.token.clone(), ledger.user.clone())
        };

        let (user, token) = match change {
            Change::Session(session) => (Some(session.user), Some(session.token.access_token)),
            Change::User(user) => {
                if current_token.is_none() {
                    return Applied::Unchanged;
                }
                (Some(user), current_token.clone())
            }
            Change::Cleared => (None, None),
            Change::Expired { token } => {
                if current_token.as_deref() != Some(token.as_str()) {
                    return Applied::Unchanged;
                }
                info!("session expired");
                (None, None)
            }
        };

        if user == current_user && token == current_token {
            self.ledger().mark_applied(ticket);
            return Applied::Unchanged;
        }

        if token != current_token {
            self.persist(token.as_deref()).await;
        }

        let authenticated = user.is_some();
        {
            let mut ledger = self.ledger();
            ledger.mark_applied(ticket);
            ledger.set_session(user, token);
            self.publish(&ledger);
        }

        let mut bg = self.background();
        if authenticated {
            if bg.watcher.as_ref().is_none_or(JoinHandle::is_finished) {
                bg.watcher = Some(watcher::spawn_expiry_watcher(self.downgrade(), &self.inner.config));
            }
        } else {
            bg.stop_watcher();
        }
        Applied::Changed
    }

    /// Mirror the token into the store. Storage trouble does not undo a
    /// session the provider already confirmed.
    async fn persist(&self, token: Option<&str>) {
        let result = match token {
            Some(token) => self.inner.store.save(token).await,
            None => self.inner.store.clear().await,
        };
        if let Err(e) = result {
            warn!(error = %e, "token store update failed");
        }
    }
}

impl std::fmt::Debug for SessionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGateway")
            .field("session", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// IN-FLIGHT GUARD
// =============================================================================

/// Holds one unit of the loading count; releasing it happens on drop.
struct InFlight<'a> {
    gateway: &'a SessionGateway,
    ticket: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut ledger = self.gateway.ledger();
        ledger.finish();
        self.gateway.publish(&ledger);
    }
}

// =============================================================================
// EVENT PUMP
// =============================================================================

fn spawn_event_pump(gateway: WeakGateway, mut events: SessionEvents) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let Some(gateway) = gateway.upgrade() else {
                break;
            };
            debug!(?event, "provider session event");
            gateway.handle_event(event).await;
        }
        debug!("provider event stream closed");
    })
}

#[cfg(test)]
#[path = "gateway_test.rs"]
mod tests;
