use super::*;
use crate::session::test_helpers::{MockStore, sample_user, session_with};

#[test]
fn unmounted_guard_is_loading_without_error() {
    let session = Arc::new(session_with(Arc::new(MockStore::new())));
    let guard = AuthGuard::new(session);
    assert!(!guard.is_mounted());
    assert!(guard.is_loading());
    assert!(guard.error().is_none());
}

#[test]
fn mount_before_settlement_sets_no_error() {
    let session = Arc::new(session_with(Arc::new(MockStore::new())));
    let guard = AuthGuard::attach(session);
    assert_eq!(
        guard.snapshot(),
        GuardSnapshot { is_authenticated: false, is_loading: false, error: None }
    );
}

#[tokio::test]
async fn mount_after_unauthenticated_settlement_requires_auth() {
    let session = Arc::new(session_with(Arc::new(MockStore::new())));
    session.check_auth_status().await;

    let guard = AuthGuard::attach(session);
    assert_eq!(guard.error(), Some(AUTH_REQUIRED));
    assert!(!guard.is_loading());
    assert!(!guard.is_authenticated());
}

#[tokio::test]
async fn mount_after_authenticated_settlement_has_no_error() {
    let store = Arc::new(MockStore::new().with_valid_token(sample_user()));
    let session = Arc::new(session_with(store));
    session.check_auth_status().await;

    let guard = AuthGuard::attach(session);
    assert!(guard.error().is_none());
    assert!(guard.is_authenticated());
}

#[tokio::test]
async fn check_is_not_reevaluated_after_mount() {
    let session = Arc::new(session_with(Arc::new(MockStore::new())));
    let mut guard = AuthGuard::attach(session.clone());
    assert!(guard.error().is_none());

    // settles unauthenticated after the guard mounted
    session.check_auth_status().await;
    guard.mount();
    assert!(guard.error().is_none());
}

#[tokio::test]
async fn error_persists_after_later_login() {
    let session = Arc::new(session_with(Arc::new(MockStore::new())));
    session.check_auth_status().await;
    let guard = AuthGuard::attach(session.clone());
    assert_eq!(guard.error(), Some(AUTH_REQUIRED));

    session.login("a", "b").await;
    assert!(guard.is_authenticated());
    assert_eq!(guard.error(), Some(AUTH_REQUIRED));
}

#[tokio::test]
async fn mount_while_initializing_sets_no_error_and_reports_session_loading() {
    let store = Arc::new(MockStore::gated().with_valid_token(sample_user()));
    let session = Arc::new(session_with(store.clone()));

    let task = tokio::spawn({
        let session = session.clone();
        async move { session.check_auth_status().await }
    });
    store.wait_entered().await;

    let guard = AuthGuard::attach(session.clone());
    assert!(guard.error().is_none());
    assert!(guard.is_loading(), "session is still initializing");

    store.release();
    assert!(task.await.unwrap());
    assert!(!guard.is_loading());
    assert!(guard.is_authenticated());
    assert!(guard.error().is_none());
}
