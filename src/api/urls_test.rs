use std::sync::Arc;

use serde_json::json;

use super::*;
use crate::api::test_server::{MockApi, UNREACHABLE_BASE_URL, client_for};
use crate::storage::{CLIENT_ID_KEY, KeyValueStore, MemoryStore, TOKEN_KEY};

// =============================================================================
// shorten_url
// =============================================================================

#[tokio::test]
async fn shorten_returns_body_untouched() {
    let mock = MockApi::new();
    let record = json!({ "shortCode": "abc", "originalUrl": "https://rust-lang.org", "clicks": 0 });
    mock.respond("POST", "/api/urls", 201, record.to_string());
    let base = mock.serve().await;
    let store = Arc::new(MemoryStore::new());
    let client = client_for(&base, Some(store.clone()));

    let result = client.shorten_url("https://rust-lang.org", None).await.unwrap();
    assert_eq!(result, record);

    let requests = mock.requests_to("/api/urls");
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert_eq!(req.method, "POST");
    assert_eq!(req.json(), json!({ "originalUrl": "https://rust-lang.org" }));
    assert_eq!(req.header("content-type"), Some("application/json"));
    let client_id = store.get(CLIENT_ID_KEY).unwrap();
    assert_eq!(req.header("x-client-id"), Some(client_id.as_str()));
    assert!(req.header("authorization").is_none());
}

#[tokio::test]
async fn shorten_includes_custom_alias_when_given() {
    let mock = MockApi::new();
    mock.respond("POST", "/api/urls", 200, "{}");
    let base = mock.serve().await;
    let client = client_for(&base, None);

    client.shorten_url("https://x.test", Some("mine")).await.unwrap();
    assert_eq!(
        mock.requests()[0].json(),
        json!({ "originalUrl": "https://x.test", "customAlias": "mine" })
    );
}

#[tokio::test]
async fn shorten_error_uses_server_message() {
    let mock = MockApi::new();
    mock.respond("POST", "/api/urls", 429, r#"{"message":"quota exceeded"}"#);
    let base = mock.serve().await;
    let client = client_for(&base, None);

    let err = client.shorten_url("https://x.test", None).await.unwrap_err();
    assert_eq!(err.to_string(), "quota exceeded");
    assert_eq!(err.status(), Some(429));
}

#[tokio::test]
async fn shorten_error_with_plain_text_includes_status_and_excerpt() {
    let mock = MockApi::new();
    mock.respond("POST", "/api/urls", 500, "Internal Server Error");
    let base = mock.serve().await;
    let client = client_for(&base, None);

    let err = client.shorten_url("https://x.test", None).await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("500"), "{msg}");
    assert!(msg.contains("Internal Server Error"), "{msg}");
}

#[tokio::test]
async fn shorten_error_excerpt_is_bounded() {
    let mock = MockApi::new();
    let long_body = format!("<html>{}</html>", "y".repeat(400));
    mock.respond("POST", "/api/urls", 502, long_body.clone());
    let base = mock.serve().await;
    let client = client_for(&base, None);

    let msg = client.shorten_url("https://x.test", None).await.unwrap_err().to_string();
    let excerpt = msg.split_once(". ").map(|(_, rest)| rest).unwrap();
    assert!(excerpt.chars().count() <= 100);
    assert!(long_body.starts_with(excerpt));
}

#[tokio::test]
async fn shorten_network_failure_propagates() {
    let client = client_for(UNREACHABLE_BASE_URL, None);
    let err = client.shorten_url("https://x.test", None).await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert!(!err.to_string().is_empty());
}

#[tokio::test]
async fn shorten_malformed_success_body_is_error() {
    let mock = MockApi::new();
    mock.respond("POST", "/api/urls", 200, "<html>ok</html>");
    let base = mock.serve().await;
    let client = client_for(&base, None);

    let err = client.shorten_url("https://x.test", None).await.unwrap_err();
    assert!(matches!(err, ApiError::Malformed(_)));
}

#[tokio::test]
async fn shorten_empty_success_body_is_malformed() {
    let mock = MockApi::new();
    mock.respond("POST", "/api/urls", 200, "");
    let base = mock.serve().await;
    let client = client_for(&base, None);

    let err = client.shorten_url("https://x.test", None).await.unwrap_err();
    assert!(matches!(err, ApiError::Malformed(_)), "{err:?}");
}

// =============================================================================
// get_remaining_requests
// =============================================================================

#[tokio::test]
async fn remaining_requests_returns_count() {
    let mock = MockApi::new();
    mock.respond("GET", "/api/urls/remaining-requests", 200, r#"{"remainingRequests":7}"#);
    let base = mock.serve().await;
    let client = client_for(&base, Some(Arc::new(MemoryStore::new())));

    assert_eq!(client.get_remaining_requests().await, 7);
    let req = &mock.requests()[0];
    assert_eq!(req.method, "GET");
    assert!(req.header("x-client-id").is_some());
    assert!(req.header("authorization").is_none());
}

#[tokio::test]
async fn remaining_requests_attaches_stored_token() {
    let mock = MockApi::new();
    mock.respond("GET", "/api/urls/remaining-requests", 200, r#"{"remainingRequests":100}"#);
    let base = mock.serve().await;
    let store = Arc::new(MemoryStore::new());
    store.set(TOKEN_KEY, "tok-123").unwrap();
    let client = client_for(&base, Some(store));

    assert_eq!(client.get_remaining_requests().await, 100);
    assert_eq!(mock.requests()[0].header("authorization"), Some("Bearer tok-123"));
}

#[tokio::test]
async fn remaining_requests_reuses_client_id_across_calls() {
    let mock = MockApi::new();
    mock.respond("GET", "/api/urls/remaining-requests", 200, r#"{"remainingRequests":1}"#);
    mock.respond("POST", "/api/urls", 200, "{}");
    let base = mock.serve().await;
    let client = client_for(&base, Some(Arc::new(MemoryStore::new())));

    client.get_remaining_requests().await;
    client.shorten_url("https://x.test", None).await.unwrap();
    let ids: Vec<_> = mock
        .requests()
        .iter()
        .map(|r| r.header("x-client-id").unwrap().to_owned())
        .collect();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], ids[1]);
}

#[tokio::test]
async fn remaining_requests_network_failure_is_zero() {
    let client = client_for(UNREACHABLE_BASE_URL, None);
    assert_eq!(client.get_remaining_requests().await, 0);
}

#[tokio::test]
async fn remaining_requests_error_status_is_zero() {
    let mock = MockApi::new();
    mock.respond("GET", "/api/urls/remaining-requests", 503, "unavailable");
    let base = mock.serve().await;
    let client = client_for(&base, None);

    assert_eq!(client.get_remaining_requests().await, 0);
}

#[tokio::test]
async fn remaining_requests_malformed_body_is_zero() {
    let mock = MockApi::new();
    mock.respond("GET", "/api/urls/remaining-requests", 200, r#"{"left":3}"#);
    let base = mock.serve().await;
    let client = client_for(&base, None);

    assert_eq!(client.get_remaining_requests().await, 0);
}
