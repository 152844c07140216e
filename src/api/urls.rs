//! URL shortening endpoints with anonymous usage accounting.

use serde_json::Value;

use super::{ApiClient, CLIENT_ID_HEADER};
use crate::error::ApiError;
use crate::types::{RemainingRequestsResponse, ShortenRequest};

const SHORTEN_FALLBACK: &str = "Failed to shorten URL";
const REMAINING_FALLBACK: &str = "Failed to get remaining requests";

impl ApiClient {
    /// Shorten `original_url`, optionally under `custom_alias`.
    ///
    /// The shortened-link record is returned exactly as the server sent it.
    ///
    /// # Errors
    ///
    /// Every failure propagates: [`ApiError::Transport`] when no response
    /// arrives, [`ApiError::Status`] carrying the server's `message` (or a
    /// status-plus-excerpt message) for non-2xx responses, and
    /// [`ApiError::Malformed`] for a 2xx body that is not JSON.
    pub async fn shorten_url(&self, original_url: &str, custom_alias: Option<&str>) -> Result<Value, ApiError> {
        let client_id = self.identity.get_or_create();
        let url = self.url("/api/urls");
        tracing::debug!(%url, %client_id, "shortening URL");

        let payload = ShortenRequest { original_url, custom_alias: custom_alias.filter(|alias| !alias.is_empty()) };
        let request = self
            .http
            .post(url)
            .header(CLIENT_ID_HEADER, client_id)
            .json(&payload);

        let result = self.send_json::<Value>(request, SHORTEN_FALLBACK).await;
        if let Err(e) = &result {
            tracing::error!(error = %e, "shorten request failed");
        }
        result
    }

    /// How many shortening requests the caller has left.
    ///
    /// Advisory only: any failure is logged and reported as `0`.
    pub async fn get_remaining_requests(&self) -> u64 {
        match self.fetch_remaining_requests().await {
            Ok(remaining) => remaining,
            Err(e) => {
                tracing::warn!(error = %e, "failed to get remaining requests");
                0
            }
        }
    }

    async fn fetch_remaining_requests(&self) -> Result<u64, ApiError> {
        let client_id = self.identity.get_or_create();
        let url = self.url("/api/urls/remaining-requests");
        tracing::debug!(%url, %client_id, "fetching remaining requests");

        let mut request = self.http.get(url).header(CLIENT_ID_HEADER, client_id);
        if let Some(token) = self.stored_token() {
            request = request.bearer_auth(token);
        }
        let body: RemainingRequestsResponse = self.send_json(request, REMAINING_FALLBACK).await?;
        Ok(body.remaining_requests)
    }
}

#[cfg(test)]
#[path = "urls_test.rs"]
mod tests;
