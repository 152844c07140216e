use super::*;

#[test]
fn message_field_is_used_verbatim() {
    let msg = error_message_from_body(429, r#"{"message":"quota exceeded"}"#, "Failed to shorten URL");
    assert_eq!(msg, "quota exceeded");
}

#[test]
fn json_without_message_uses_fallback_and_status() {
    let msg = error_message_from_body(400, r#"{"errors":["bad"]}"#, "Failed to shorten URL");
    assert_eq!(msg, "Failed to shorten URL: 400");
}

#[test]
fn empty_message_uses_fallback() {
    let msg = error_message_from_body(400, r#"{"message":""}"#, "Failed");
    assert_eq!(msg, "Failed: 400");
}

#[test]
fn plain_text_body_is_excerpted() {
    let msg = error_message_from_body(500, "Internal Server Error", "Failed to shorten URL");
    assert_eq!(msg, "Failed to shorten URL: 500. Internal Server Error");
}

#[test]
fn long_plain_text_is_truncated_to_excerpt_limit() {
    let body = "x".repeat(500);
    let msg = error_message_from_body(502, &body, "Failed");
    let excerpt = msg.strip_prefix("Failed: 502. ").unwrap();
    assert_eq!(excerpt.chars().count(), ERROR_EXCERPT_CHARS);
}

#[test]
fn excerpt_counts_characters_not_bytes() {
    let body = "ü".repeat(150);
    let msg = error_message_from_body(500, &body, "Failed");
    let excerpt = msg.strip_prefix("Failed: 500. ").unwrap();
    assert_eq!(excerpt.chars().count(), ERROR_EXCERPT_CHARS);
}

#[test]
fn status_error_displays_message_only() {
    let err = ApiError::Status { status: 429, message: "quota exceeded".into() };
    assert_eq!(err.to_string(), "quota exceeded");
    assert_eq!(err.status(), Some(429));
}

#[test]
fn unauthorized_statuses_are_detected() {
    assert!(ApiError::Status { status: 401, message: String::new() }.is_unauthorized());
    assert!(ApiError::Status { status: 403, message: String::new() }.is_unauthorized());
    assert!(!ApiError::Status { status: 500, message: String::new() }.is_unauthorized());
    assert!(!ApiError::MissingToken.is_unauthorized());
}
