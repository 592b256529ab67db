use super::*;
use crate::provider::test_helpers::make_jwt;

const NOW: u64 = 1_750_000_000;

// =============================================================================
// decode_claims
// =============================================================================

#[test]
fn decode_reads_standard_claims() {
    let token = make_jwt(serde_json::json!({ "sub": "a@x.com", "user_id": "u1", "exp": NOW + 60, "iat": NOW }));
    let claims = decode_claims(&token).unwrap();
    assert_eq!(claims.sub.as_deref(), Some("a@x.com"));
    assert_eq!(claims.user_id.as_deref(), Some("u1"));
    assert_eq!(claims.exp, Some(NOW + 60));
    assert_eq!(claims.iat, Some(NOW));
}

#[test]
fn decode_tolerates_padding() {
    let token = make_jwt(serde_json::json!({ "exp": 1 }));
    let parts: Vec<&str> = token.split('.').collect();
    let padded = format!("{}.{}==.{}", parts[0], parts[1], parts[2]);
    assert_eq!(decode_claims(&padded).unwrap().exp, Some(1));
}

#[test]
fn decode_rejects_wrong_segment_count() {
    assert!(decode_claims("only.two").is_none());
    assert!(decode_claims("a.b.c.d").is_none());
    assert!(decode_claims("").is_none());
}

#[test]
fn decode_rejects_non_json_payload() {
    let payload = URL_SAFE_NO_PAD.encode("not json");
    assert!(decode_claims(&format!("h.{payload}.s")).is_none());
}

// =============================================================================
// expiry
// =============================================================================

#[test]
fn future_exp_not_expired() {
    let token = make_jwt(serde_json::json!({ "exp": NOW + 10 }));
    assert!(!is_expired_at(&token, NOW));
    assert_eq!(seconds_until_expiry_at(&token, NOW), 10);
}

#[test]
fn past_exp_is_expired() {
    let token = make_jwt(serde_json::json!({ "exp": NOW - 1 }));
    assert!(is_expired_at(&token, NOW));
    assert_eq!(seconds_until_expiry_at(&token, NOW), 0);
}

#[test]
fn missing_exp_has_no_expiry() {
    let token = make_jwt(serde_json::json!({ "sub": "x" }));
    assert!(!is_expired_at(&token, NOW));
    assert_eq!(seconds_until_expiry_at(&token, NOW), 0);
}

#[test]
fn opaque_tokens_not_known_expired() {
    assert!(!is_expired_at("4f9a0c1e", NOW));
    let stale = make_jwt(serde_json::json!({ "exp": NOW - 1 }));
    assert!(is_expired_at(&stale, NOW));
    let fresh = make_jwt(serde_json::json!({ "exp": NOW + 1 }));
    assert!(!is_expired_at(&fresh, NOW));
}

// =============================================================================
// SessionCountdown
// =============================================================================

#[test]
fn countdown_without_token() {
    let c = SessionCountdown::at(None, NOW, DEFAULT_EXPIRING_SOON_SECS);
    assert_eq!(c.remaining, "--:--");
    assert!(!c.valid);
    assert!(!c.expiring_soon);
}

#[test]
fn countdown_opaque_token_is_valid_but_unknown() {
    let c = SessionCountdown::at(Some("4f9a0c1e"), NOW, DEFAULT_EXPIRING_SOON_SECS);
    assert_eq!(c.remaining, "--:--");
    assert!(c.valid);
    assert!(!c.expiring_soon);
}

#[test]
fn countdown_expired() {
    let token = make_jwt(serde_json::json!({ "exp": NOW - 5 }));
    let c = SessionCountdown::at(Some(&token), NOW, DEFAULT_EXPIRING_SOON_SECS);
    assert_eq!(c.remaining, "expired");
    assert!(!c.valid);
    assert!(c.expiring_soon);
}

#[test]
fn countdown_minutes_and_seconds() {
    let token = make_jwt(serde_json::json!({ "exp": NOW + 25 * 60 + 7 }));
    let c = SessionCountdown::at(Some(&token), NOW, DEFAULT_EXPIRING_SOON_SECS);
    assert_eq!(c.remaining, "25:07");
    assert!(c.valid);
    assert!(!c.expiring_soon);
}

#[test]
fn countdown_hours_and_minutes() {
    let token = make_jwt(serde_json::json!({ "exp": NOW + 2 * 3600 + 5 * 60 + 59 }));
    let c = SessionCountdown::at(Some(&token), NOW, DEFAULT_EXPIRING_SOON_SECS);
    assert_eq!(c.remaining, "02:05h");
}

#[test]
fn countdown_exactly_one_hour_uses_hours() {
    let token = make_jwt(serde_json::json!({ "exp": NOW + 3600 }));
    let c = SessionCountdown::at(Some(&token), NOW, DEFAULT_EXPIRING_SOON_SECS);
    assert_eq!(c.remaining, "01:00h");
}

#[test]
fn countdown_expiring_soon_at_threshold() {
    let token = make_jwt(serde_json::json!({ "exp": NOW + 300 }));
    let c = SessionCountdown::at(Some(&token), NOW, 300);
    assert_eq!(c.remaining, "05:00");
    assert!(c.expiring_soon);
    assert!(c.valid);
}
