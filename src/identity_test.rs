use super::*;

// =============================================================================
// Identity
// =============================================================================

#[test]
fn identity_deserializes_api_user() {
    let json = serde_json::json!({
        "id": "7f1c",
        "email": "ana@example.com",
        "full_name": "Ana Souza",
        "created_at": "2025-03-01T12:00:00",
        "updated_at": null
    });
    let user: Identity = serde_json::from_value(json).unwrap();
    assert_eq!(user.id, "7f1c");
    assert_eq!(user.full_name.as_deref(), Some("Ana Souza"));
    assert!(user.updated_at.is_none());
    assert!(user.metadata.is_empty());
}

#[test]
fn identity_keeps_unknown_fields_as_metadata() {
    let json = serde_json::json!({
        "id": "u1",
        "email": "a@x.com",
        "role": "admin",
        "workspace_ids": [1, 2]
    });
    let user: Identity = serde_json::from_value(json).unwrap();
    assert_eq!(user.metadata["role"], "admin");

    let back = serde_json::to_value(&user).unwrap();
    assert_eq!(back["workspace_ids"], serde_json::json!([1, 2]));
    assert!(back.get("full_name").is_none());
}

#[test]
fn display_name_prefers_full_name() {
    let mut user = Identity::new("u1", "a@x.com");
    assert_eq!(user.display_name(), "a@x.com");
    user.full_name = Some("Ana".into());
    assert_eq!(user.display_name(), "Ana");
    user.full_name = Some(String::new());
    assert_eq!(user.display_name(), "a@x.com");
}

// =============================================================================
// AuthSession
// =============================================================================

#[test]
fn auth_session_reads_login_response() {
    let json = serde_json::json!({
        "user": { "id": "u1", "email": "a@x.com", "created_at": "2025-01-01T00:00:00" },
        "session": {
            "access_token": "abc.def.ghi",
            "token_type": "bearer",
            "expires_in": 1800
        }
    });
    let session: AuthSession = serde_json::from_value(json).unwrap();
    assert_eq!(session.user.email, "a@x.com");
    assert_eq!(session.token.access_token, "abc.def.ghi");
    assert_eq!(session.token.expires_in, 1800);
    assert!(session.token.refresh_token.is_none());
}

#[test]
fn access_token_debug_redacts_secret() {
    let mut token = AccessToken::bearer("super-secret-token");
    token.refresh_token = Some("refresh-secret".into());
    let debug = format!("{token:?}");
    assert!(!debug.contains("super-secret-token"));
    assert!(!debug.contains("refresh-secret"));
    assert!(debug.contains("bearer"));
}

// =============================================================================
// Credentials
// =============================================================================

#[test]
fn credentials_serialize_without_empty_full_name() {
    let creds = Credentials::new("a@x.com", "pw");
    let json = serde_json::to_value(&creds).unwrap();
    assert_eq!(json, serde_json::json!({ "email": "a@x.com", "password": "pw" }));
}

#[test]
fn credentials_serialize_full_name_when_present() {
    let creds = Credentials::new("a@x.com", "pw").with_full_name(Some("Ana".into()));
    let json = serde_json::to_value(&creds).unwrap();
    assert_eq!(json["full_name"], "Ana");
}

#[test]
fn credentials_debug_hides_password() {
    let creds = Credentials::new("a@x.com", "hunter2");
    assert!(!format!("{creds:?}").contains("hunter2"));
}
