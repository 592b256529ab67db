//! Gateway configuration parsed from environment variables.

use std::time::Duration;

use crate::token::DEFAULT_EXPIRING_SOON_SECS;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SESSION_CHECK_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_EXPIRY_WARNING_SECS: u64 = 60;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{var} must be greater than zero")]
    Zero { var: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Base URL of the auth API, without trailing slash.
    pub api_url: String,
    pub timeouts: HttpTimeouts,
    /// How often the expiry watcher re-checks an active session.
    pub check_interval: Duration,
    /// The watcher logs a warning when fewer seconds than this remain.
    pub expiry_warning_secs: u64,
    /// Countdown threshold for `expiring_soon`.
    pub expiring_soon_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            timeouts: HttpTimeouts::default(),
            check_interval: Duration::from_secs(DEFAULT_SESSION_CHECK_INTERVAL_SECS),
            expiry_warning_secs: DEFAULT_EXPIRY_WARNING_SECS,
            expiring_soon_secs: DEFAULT_EXPIRING_SOON_SECS,
        }
    }
}

impl GatewayConfig {
    /// Build typed config from environment variables.
    ///
    /// All optional:
    /// - `PORTAL_API_URL`: default `http://localhost:8000`
    /// - `PORTAL_REQUEST_TIMEOUT_SECS`: default 30
    /// - `PORTAL_CONNECT_TIMEOUT_SECS`: default 10
    /// - `PORTAL_SESSION_CHECK_INTERVAL_SECS`: default 30, must be non-zero
    /// - `PORTAL_EXPIRY_WARNING_SECS`: default 60
    /// - `PORTAL_EXPIRING_SOON_SECS`: default 300
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a numeric variable is set but unparsable,
    /// or if the check interval is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`GatewayConfig::from_env`] with an injectable lookup.
    ///
    /// # Errors
    ///
    /// See [`GatewayConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup("PORTAL_API_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_owned())
            .trim()
            .trim_end_matches('/')
            .to_owned();

        let timeouts = HttpTimeouts {
            request_secs: parse_u64(&lookup, "PORTAL_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            connect_secs: parse_u64(&lookup, "PORTAL_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
        };

        let check_secs =
            parse_u64(&lookup, "PORTAL_SESSION_CHECK_INTERVAL_SECS", DEFAULT_SESSION_CHECK_INTERVAL_SECS)?;
        if check_secs == 0 {
            return Err(ConfigError::Zero { var: "PORTAL_SESSION_CHECK_INTERVAL_SECS" });
        }

        Ok(Self {
            api_url,
            timeouts,
            check_interval: Duration::from_secs(check_secs),
            expiry_warning_secs: parse_u64(&lookup, "PORTAL_EXPIRY_WARNING_SECS", DEFAULT_EXPIRY_WARNING_SECS)?,
            expiring_soon_secs: parse_u64(&lookup, "PORTAL_EXPIRING_SOON_SECS", DEFAULT_EXPIRING_SOON_SECS)?,
        })
    }

    /// Override the API base URL, normalizing the trailing slash.
    #[must_use]
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        api_url.trim().trim_end_matches('/').clone_into(&mut self.api_url);
        self
    }
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { var, value: raw }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
