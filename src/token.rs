//! Local JWT inspection for expiry checks.
//!
//! DESIGN
//! ======
//! Only the payload segment is decoded and the signature is never checked.
//! This is good enough to skip a round-trip for a token that is obviously
//! expired and to render a countdown; authority stays with the provider's
//! `verify` endpoint.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

/// Default threshold under which a countdown is flagged as expiring soon.
pub const DEFAULT_EXPIRING_SOON_SECS: u64 = 300;

const NO_SESSION_LABEL: &str = "--:--";
const EXPIRED_LABEL: &str = "expired";

/// The registered claims we care about. Everything else is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    pub sub: Option<String>,
    pub user_id: Option<String>,
    /// Expiry, seconds since the Unix epoch.
    pub exp: Option<u64>,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: Option<u64>,
}

/// Current wall-clock time as seconds since the Unix epoch.
#[must_use]
pub fn now_secs() -> u64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    dur.as_secs()
}

/// Decode a JWT's payload without verifying it. `None` if malformed.
#[must_use]
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_sig), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Whether the token is known to be past its expiry at `now`.
///
/// Tokens without a readable `exp` (opaque tokens, or JWTs that omit it) are
/// never expired locally. They are left to the provider's `get_user` and
/// `verify`, so restoring one always costs a round-trip.
#[must_use]
pub fn is_expired_at(token: &str, now: u64) -> bool {
    decode_claims(token)
        .and_then(|c| c.exp)
        .is_some_and(|exp| exp < now)
}

/// Seconds left before the token expires at `now`; zero when expired or
/// undecodable.
#[must_use]
pub fn seconds_until_expiry_at(token: &str, now: u64) -> u64 {
    decode_claims(token)
        .and_then(|c| c.exp)
        .map_or(0, |exp| exp.saturating_sub(now))
}


// =============================================================================
// COUNTDOWN
// =============================================================================

/// Remaining session time, formatted for a status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCountdown {
    /// `--:--`, `expired`, `MM:SS`, or `HH:MMh` once an hour or more remains.
    pub remaining: String,
    pub expiring_soon: bool,
    pub valid: bool,
}

impl SessionCountdown {
    /// Countdown for an optional token evaluated at `now`.
    #[must_use]
    pub fn at(token: Option<&str>, now: u64, expiring_soon_secs: u64) -> Self {
        let Some(token) = token else {
            return Self { remaining: NO_SESSION_LABEL.to_owned(), expiring_soon: false, valid: false };
        };

        // Opaque tokens have no local expiry; only the provider can judge them.
        let Some(exp) = decode_claims(token).and_then(|c| c.exp) else {
            return Self { remaining: NO_SESSION_LABEL.to_owned(), expiring_soon: false, valid: true };
        };

        let secs = exp.saturating_sub(now);
        if secs == 0 {
            return Self { remaining: EXPIRED_LABEL.to_owned(), expiring_soon: true, valid: false };
        }

        Self { remaining: format_remaining(secs), expiring_soon: secs <= expiring_soon_secs, valid: true }
    }

    /// Countdown evaluated against the current wall clock.
    #[must_use]
    pub fn now(token: Option<&str>, expiring_soon_secs: u64) -> Self {
        Self::at(token, now_secs(), expiring_soon_secs)
    }
}

fn format_remaining(secs: u64) -> String {
    let minutes = secs / 60;
    if minutes >= 60 {
        format!("{:02}:{:02}h", minutes / 60, minutes % 60)
    } else {
        format!("{:02}:{:02}", minutes, secs % 60)
    }
}

#[cfg(test)]
#[path = "token_test.rs"]
mod tests;
