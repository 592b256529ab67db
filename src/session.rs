//! Session record and the bookkeeping that decides which results apply.
//!
//! DESIGN
//! ======
//! Every gateway operation draws a ticket from an issuance counter. A result
//! may be applied only if no result from a logically-later ticket has been
//! applied already, so overlapping calls converge on the state of the last
//! one issued rather than the last one to come back. Provider notifications
//! are stamped with the current counter, which lets them supersede results
//! of operations issued before them.
//!
//! The published [`Session`] is always derived from the whole [`Ledger`] in
//! one step, so observers never see `user` and `loading` from different
//! moments.

use crate::identity::Identity;

// =============================================================================
// SESSION
// =============================================================================

/// Where the session stands, derived from a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Initial state has not been resolved yet.
    Unresolved,
    Anonymous,
    Authenticated,
}

/// Authentication state as observers see it.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub current_user: Option<Identity>,
    /// True while the initial state is resolving or an operation is pending.
    pub is_loading: bool,
    /// False until the initial state has been resolved once.
    pub resolved: bool,
}

impl Session {
    /// The state before anything is known: loading, no user.
    #[must_use]
    pub fn unresolved() -> Self {
        Self { current_user: None, is_loading: true, resolved: false }
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        if !self.resolved {
            SessionPhase::Unresolved
        } else if self.current_user.is_some() {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Anonymous
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current_user.is_some()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::unresolved()
    }
}

// =============================================================================
// LEDGER
// =============================================================================

/// Authoritative gateway state. The published [`Session`] is its projection.
#[derive(Debug, Default)]
pub(crate) struct Ledger {
    /// Highest ticket handed out.
    issued: u64,
    /// Ticket of the most recently applied result.
    applied: u64,
    /// Operations started but not yet settled.
    in_flight: usize,
    pub(crate) resolved: bool,
    /// Set on shutdown; nothing applies afterwards.
    pub(crate) closed: bool,
    pub(crate) user: Option<Identity>,
    pub(crate) token: Option<String>,
}

impl Ledger {
    /// Start an operation and return its ticket.
    pub(crate) fn begin(&mut self) -> u64 {
        self.issued += 1;
        self.in_flight += 1;
        self.issued
    }

    /// Settle an operation started with [`Ledger::begin`].
    pub(crate) fn finish(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    /// Stamp for an out-of-band change: as late as anything issued so far.
    pub(crate) fn stamp(&self) -> u64 {
        self.issued
    }

    /// Whether a result carrying `ticket` may still be applied.
    pub(crate) fn accepts(&self, ticket: u64) -> bool {
        !self.closed && ticket >= self.applied
    }

    pub(crate) fn mark_applied(&mut self, ticket: u64) {
        self.applied = ticket;
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub(crate) fn loading(&self) -> bool {
        !self.closed && (!self.resolved || self.in_flight > 0)
    }

    /// Replace the session: user and token move together.
    pub(crate) fn set_session(&mut self, user: Option<Identity>, token: Option<String>) {
        self.user = user;
        self.token = token;
    }

    /// The record observers should currently see.
    pub(crate) fn snapshot(&self) -> Session {
        Session { current_user: self.user.clone(), is_loading: self.loading(), resolved: self.resolved }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
