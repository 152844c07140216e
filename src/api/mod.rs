//! HTTP access to the remote shortening API.
//!
//! DESIGN
//! ======
//! `ApiClient` is stateless apart from configuration: a shared `reqwest`
//! client, the base URL, the anonymous client identity, and a handle to
//! client-local storage (read for the bearer token). Every request funnels
//! through [`ApiClient::send_text`], which maps transport failures and
//! non-2xx responses into [`ApiError`] the same way for every endpoint.
//!
//! ERROR HANDLING
//! ==============
//! Whether a failure propagates is decided per operation by the caller:
//! `shorten_url` returns it, `get_remaining_requests` swallows it, and the
//! session layer wraps it into an [`crate::types::OpResult`].

pub mod auth;
pub mod urls;

use std::time::Duration;

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::{ApiError, error_message_from_body};
use crate::identity::ClientIdentity;
use crate::storage::{SharedStore, TOKEN_KEY};

pub const CLIENT_ID_HEADER: &str = "X-Client-Id";

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    identity: ClientIdentity,
    storage: SharedStore,
}

impl ApiClient {
    /// Build a client from config and a client-local storage handle.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, storage: SharedStore) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeouts.request_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.timeouts.connect_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if config.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            identity: ClientIdentity::new(storage.clone()),
            storage,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    #[must_use]
    pub fn storage(&self) -> &SharedStore {
        &self.storage
    }

    /// Bearer token currently persisted in client-local storage, if any.
    #[must_use]
    pub fn stored_token(&self) -> Option<String> {
        self.storage
            .as_ref()?
            .get(TOKEN_KEY)
            .filter(|token| !token.is_empty())
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Send a request and return the body of a 2xx response.
    ///
    /// Non-2xx responses become [`ApiError::Status`] with a message taken from
    /// the body, or built from `fallback` when the body carries none.
    pub(crate) async fn send_text(&self, request: RequestBuilder, fallback: &str) -> Result<String, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !status.is_success() {
            tracing::error!(status = status.as_u16(), body = %text, "API error");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message_from_body(status.as_u16(), &text, fallback),
            });
        }
        Ok(text)
    }

    /// Send a request and parse the 2xx body as `T`. An empty body is
    /// [`ApiError::Malformed`].
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let text = self.send_text(request, fallback).await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Malformed(e.to_string()))
    }
}

/// Parse a success body, treating an empty body as JSON `null`. Only for
/// endpoints whose success body is optional.
pub(crate) fn parse_body<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    let text = if text.trim().is_empty() { "null" } else { text };
    serde_json::from_str(text).map_err(|e| ApiError::Malformed(e.to_string()))
}

#[cfg(test)]
pub(crate) mod test_server;
