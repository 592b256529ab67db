//! Auth errors relayed from the identity provider.
//!
//! ERROR HANDLING
//! ==============
//! The gateway never classifies or rewrites these. Whatever the provider (or
//! its transport) produced is handed back to the caller as a value, so the
//! variants here describe where a failure came from, not what to do about it.

// =============================================================================
// ERROR
// =============================================================================

/// Failure reported by the identity provider or the path to it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The provider rejected the request (bad credentials, duplicate account,
    /// malformed input, rate limiting, expired confirmation link).
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The presented token is missing, expired or invalid (HTTP 401/403).
    #[error("token expired or invalid")]
    Unauthorized { status: u16 },

    /// The request never produced a provider response.
    #[error("network failure: {0}")]
    Network(String),

    /// The provider answered with a body we could not decode.
    #[error("unexpected provider response: {0}")]
    Decode(String),

    /// The local token store could not be read or written.
    #[error("token storage failed: {0}")]
    Storage(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl AuthError {
    /// Human-readable message, as the provider phrased it where possible.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// HTTP status attached to the failure, if the provider answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } | Self::Unauthorized { status } => Some(*status),
            _ => None,
        }
    }

    /// Grepable error code for logs and CLI output.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Rejected { .. } => "E_AUTH_REJECTED",
            Self::Unauthorized { .. } => "E_AUTH_UNAUTHORIZED",
            Self::Network(_) => "E_AUTH_NETWORK",
            Self::Decode(_) => "E_AUTH_DECODE",
            Self::Storage(_) => "E_AUTH_STORAGE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    /// Whether a caller-side retry could plausibly succeed.
    ///
    /// The gateway itself never retries; this is advice for callers.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Rejected { status: 429 | 500..=599, .. })
    }

    /// True when the failure means the current token is no longer accepted.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
