//! REST identity provider for the portal backend.
//!
//! Thin reqwest wrapper over `{api_url}/api/v1/auth`:
//!
//! | Operation | Request            | Success body              |
//! |-----------|--------------------|---------------------------|
//! | sign-in   | `POST /login`      | `{ user, session }`       |
//! | sign-up   | `POST /register`   | `{ user, session? }`      |
//! | sign-out  | `POST /logout`     | ignored                   |
//! | get_user  | `GET /me`          | user                      |
//! | verify    | `GET /verify`      | `{ valid, user_id }`      |
//!
//! ERROR HANDLING
//! ==============
//! 401/403 on a token-bearing request means the token is done and becomes
//! [`AuthError::Unauthorized`]. Any other non-success status becomes
//! [`AuthError::Rejected`] carrying the backend's `detail` message, so a bad
//! password on `/login` reads as the backend worded it.
//!
//! The backend pushes nothing on its own. The provider still owns a
//! [`SessionNotifier`] so a host can forward changes it learns about
//! elsewhere (another window, a refresh flow).

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::GatewayConfig;
use crate::error::AuthError;
use crate::identity::{AccessToken, AuthSession, Credentials, Identity, SignUpOutcome};
use crate::provider::{IdentityProvider, SessionEvents, SessionNotifier, Subscription};

const AUTH_PATH: &str = "/api/v1/auth";

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpIdentityProvider {
    http: reqwest::Client,
    base_url: String,
    notifier: SessionNotifier,
}

impl HttpIdentityProvider {
    /// Build a provider against `config.api_url` with the configured timeouts.
    ///
    /// # Errors
    ///
    /// [`AuthError::HttpClientBuild`] if the TLS backend cannot initialize.
    pub fn new(config: &GatewayConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| AuthError::HttpClientBuild(e.to_string()))?;
        let base_url = format!("{}{AUTH_PATH}", config.api_url.trim_end_matches('/'));
        Ok(Self { http, base_url, notifier: SessionNotifier::new() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fan-out used for session changes learned outside this client.
    #[must_use]
    pub fn notifier(&self) -> &SessionNotifier {
        &self.notifier
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    /// Send a request and return the body of a success response.
    async fn send(&self, request: reqwest::RequestBuilder, bearer: bool) -> Result<String, AuthError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        debug!(status, "auth api response");

        if (200..300).contains(&status) {
            Ok(text)
        } else {
            Err(parse_error(status, &text, bearer))
        }
    }
}

#[async_trait::async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<AuthSession, AuthError> {
        let request = self.http.post(self.url("/login")).json(credentials);
        let body = self.send(request, false).await?;
        parse_json(&body)
    }

    async fn sign_up_with_password(&self, credentials: &Credentials) -> Result<SignUpOutcome, AuthError> {
        let request = self.http.post(self.url("/register")).json(credentials);
        let body = self.send(request, false).await?;
        let registered: RegisterResponse = parse_json(&body)?;
        Ok(match registered.session {
            Some(token) => SignUpOutcome::SignedIn(AuthSession { user: registered.user, token }),
            None => SignUpOutcome::ConfirmationRequired(registered.user),
        })
    }

    async fn sign_out(&self, access_token: Option<&str>) -> Result<(), AuthError> {
        let Some(token) = access_token else {
            return Ok(());
        };
        let request = self.http.post(self.url("/logout")).bearer_auth(token);
        self.send(request, true).await?;
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<Identity, AuthError> {
        let request = self.http.get(self.url("/me")).bearer_auth(access_token);
        let body = self.send(request, true).await?;
        parse_json(&body)
    }

    async fn verify(&self, access_token: &str) -> Result<bool, AuthError> {
        let request = self.http.get(self.url("/verify")).bearer_auth(access_token);
        let body = self.send(request, true).await?;
        let verdict: VerifyResponse = parse_json(&body)?;
        Ok(verdict.valid)
    }

    fn subscribe(&self) -> (Subscription, SessionEvents) {
        self.notifier.subscribe()
    }
}

impl std::fmt::Debug for HttpIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpIdentityProvider")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(serde::Deserialize)]
struct RegisterResponse {
    user: Identity,
    #[serde(default)]
    session: Option<AccessToken>,
}

#[derive(serde::Deserialize)]
struct VerifyResponse {
    valid: bool,
}

// =============================================================================
// PARSING
// =============================================================================

fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, AuthError> {
    serde_json::from_str(body).map_err(|e| AuthError::Decode(e.to_string()))
}

/// Map a non-success response to an [`AuthError`].
///
/// The backend reports failures as `{"detail": "..."}`; validation failures
/// use a list of `{"msg": "..."}` objects instead.
fn parse_error(status: u16, body: &str, bearer: bool) -> AuthError {
    if bearer && matches!(status, 401 | 403) {
        return AuthError::Unauthorized { status };
    }

    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").cloned())
        .and_then(|detail| match detail {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Array(items) => items
                .iter()
                .find_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
                .map(str::to_owned),
            _ => None,
        })
        .filter(|s| !s.is_empty());

    AuthError::Rejected { status, message: detail.unwrap_or_else(|| format!("HTTP error! status: {status}")) }
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
