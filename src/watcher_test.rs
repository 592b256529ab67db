use super::*;
use crate::gateway::SessionGateway;
use crate::provider::test_helpers::{FakeProvider, jwt_expiring_in};
use crate::store::MemoryTokenStore;
use std::sync::Arc;
use std::sync::atomic::Ordering;

const EMAIL: &str = "a@x.com";

fn provider() -> FakeProvider {
    FakeProvider::new().with_account(EMAIL, "pw1")
}

// =============================================================================
// check_session
// =============================================================================

#[tokio::test]
async fn no_token_is_no_session() {
    let provider = provider();
    let check = check_session(&provider, None, now_secs(), 60).await;
    assert_eq!(check, SessionCheck::NoSession);
    assert_eq!(provider.verify_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn live_token_is_valid() {
    let provider = provider();
    let token = provider.issue_token(EMAIL);
    let check = check_session(&provider, Some(&token), now_secs(), 60).await;
    assert_eq!(check, SessionCheck::Valid);
}

#[tokio::test]
async fn locally_expired_token_skips_provider() {
    let provider = provider();
    let token = jwt_expiring_in(EMAIL, -5);
    let check = check_session(&provider, Some(&token), now_secs(), 60).await;
    assert_eq!(check, SessionCheck::Expired(ExpiryCause::LocallyExpired));
    assert_eq!(provider.verify_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn revoked_token_is_rejected() {
    let provider = provider();
    let token = provider.issue_token(EMAIL);
    provider.revoke(&token);
    let check = check_session(&provider, Some(&token), now_secs(), 60).await;
    assert_eq!(check, SessionCheck::Expired(ExpiryCause::Rejected));
}

#[tokio::test]
async fn unreachable_provider_is_unverified() {
    let provider = provider();
    let token = provider.issue_token(EMAIL);
    provider.fail_verify(Some(AuthError::Network("timed out".into())));
    let check = check_session(&provider, Some(&token), now_secs(), 60).await;
    assert_eq!(check, SessionCheck::Unverified(AuthError::Network("timed out".into())));
}

#[tokio::test]
async fn opaque_token_is_left_to_provider() {
    let provider = provider();
    let check = check_session(&provider, Some("opaque"), now_secs(), 60).await;
    assert_eq!(check, SessionCheck::Expired(ExpiryCause::Rejected));
    assert_eq!(provider.verify_calls.load(Ordering::SeqCst), 1);
}

// =============================================================================
// background watcher
// =============================================================================

async fn signed_in(provider: &Arc<FakeProvider>) -> SessionGateway {
    let gateway = SessionGateway::new(
        provider.clone(),
        Arc::new(MemoryTokenStore::new()),
        GatewayConfig::default(),
    );
    gateway.initialize().await.unwrap();
    gateway.sign_in(EMAIL, "pw1").await.unwrap();
    gateway
}

#[tokio::test(start_paused = true)]
async fn revoked_session_is_signed_out() {
    let provider = Arc::new(provider());
    let gateway = signed_in(&provider).await;
    let token = gateway.current_token().unwrap();
    provider.revoke(&token);

    let mut rx = gateway.subscribe();
    tokio::time::timeout(Duration::from_secs(120), rx.wait_for(|s| s.current_user.is_none()))
        .await
        .expect("watcher never expired the session")
        .unwrap();

    assert!(!gateway.is_loading());
    assert!(gateway.current_token().is_none());
}

#[tokio::test(start_paused = true)]
async fn network_failure_keeps_session() {
    let provider = Arc::new(provider());
    let gateway = signed_in(&provider).await;
    provider.fail_verify(Some(AuthError::Network("offline".into())));

    tokio::time::sleep(Duration::from_secs(95)).await;

    assert!(provider.verify_calls.load(Ordering::SeqCst) >= 2);
    assert!(gateway.current_user().is_some());
}

#[tokio::test(start_paused = true)]
async fn watcher_stops_after_sign_out() {
    let provider = Arc::new(provider());
    let gateway = signed_in(&provider).await;
    gateway.sign_out().await.unwrap();

    tokio::time::sleep(Duration::from_secs(120)).await;

    assert_eq!(provider.verify_calls.load(Ordering::SeqCst), 0);
}
