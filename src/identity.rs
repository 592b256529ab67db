//! Identity records and session payloads as the provider returns them.

use serde::{Deserialize, Serialize};

/// The authenticated user's record, owned by the identity provider.
///
/// Fields beyond `id` and `email` are kept opaque in `metadata` so provider
/// additions survive a round trip untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Unique subject identifier.
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Any other provider-supplied attributes.
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Identity {
    /// Minimal identity with no optional attributes.
    #[must_use]
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            full_name: None,
            created_at: None,
            updated_at: None,
            metadata: serde_json::Map::new(),
        }
    }

    /// Name to show in prompts and logs: full name, else email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().filter(|n| !n.is_empty()).unwrap_or(&self.email)
    }
}

/// Bearer credential issued alongside an identity.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds as reported at issuance.
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

fn default_token_type() -> String {
    "bearer".to_owned()
}

impl AccessToken {
    /// Bearer token with no refresh token and unknown lifetime.
    #[must_use]
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into(), token_type: default_token_type(), expires_in: 0, refresh_token: None }
    }
}

// Token material stays out of logs and panic messages.
impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

/// An established session: who, plus the token proving it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: Identity,
    #[serde(rename = "session")]
    pub token: AccessToken,
}

/// Result of a successful sign-up.
///
/// Whether the provider opens a session immediately is its own policy; the
/// gateway relays whichever happened.
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// Account created and signed in.
    SignedIn(AuthSession),
    /// Account created; a confirmation step is pending before sign-in.
    ConfirmationRequired(Identity),
}

/// Email/password pair sent to the provider. Not validated locally.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

impl Credentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into(), full_name: None }
    }

    #[must_use]
    pub fn with_full_name(mut self, full_name: Option<String>) -> Self {
        self.full_name = full_name;
        self
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
