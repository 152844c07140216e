//! Typed failures for API access.
//!
//! DESIGN
//! ======
//! One enum covers every way a request can go wrong: no response at all,
//! a non-2xx response, a 2xx body that does not parse, or a call made
//! without the state it needs. `Status` displays the normalized message
//! only, so callers can show it to a user verbatim.

/// Longest excerpt of a non-JSON error body carried into a message.
pub const ERROR_EXCERPT_CHARS: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No response was received (connect, TLS, or body read failure).
    #[error("network request failed: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// A success response whose body did not match the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The operation requires a bearer token and none is held.
    #[error("not authenticated: no session token")]
    MissingToken,

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),

    /// Client-local storage could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),
}

impl ApiError {
    /// HTTP status for protocol failures, `None` otherwise.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// `true` when the server rejected the credentials presented.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}

/// Turn a non-2xx response body into a human-readable message.
///
/// A JSON body with a string `message` wins. Any other JSON body yields
/// `"{fallback}: {status}"`. A body that is not JSON yields the same prefix
/// followed by an excerpt of at most [`ERROR_EXCERPT_CHARS`] characters.
#[must_use]
pub fn error_message_from_body(status: u16, body: &str, fallback: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => match json.get("message").and_then(serde_json::Value::as_str) {
            Some(message) if !message.is_empty() => message.to_owned(),
            _ => format!("{fallback}: {status}"),
        },
        Err(_) => {
            let excerpt: String = body.chars().take(ERROR_EXCERPT_CHARS).collect();
            format!("{fallback}: {status}. {excerpt}")
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
