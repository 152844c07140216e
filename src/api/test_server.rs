//! In-process HTTP stand-in for the remote API, used by unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};

use super::ApiClient;
use crate::config::ClientConfig;
use crate::storage::SharedStore;

/// Base URL nothing listens on; requests to it fail at the transport level.
pub(crate) const UNREACHABLE_BASE_URL: &str = "http://127.0.0.1:1";

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body should be JSON")
    }
}

/// Canned responses keyed by `(method, path)`; unknown routes answer 404.
#[derive(Clone, Default)]
pub(crate) struct MockApi {
    routes: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: &str, path: &str, status: u16, body: impl Into<String>) -> &Self {
        self.routes
            .lock()
            .expect("routes lock")
            .insert((method.to_owned(), path.to_owned()), (status, body.into()));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    /// Bind to an ephemeral local port and serve in the background.
    pub async fn serve(&self) -> String {
        let api = self.clone();
        let app = Router::new().fallback(move |method: Method, uri: Uri, headers: HeaderMap, body: String| {
            let api = api.clone();
            async move { api.handle(&method, &uri, &headers, body) }
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("test server failed");
        });
        format!("http://{addr}")
    }

    fn handle(&self, method: &Method, uri: &Uri, headers: &HeaderMap, body: String) -> Response {
        let path = uri.path().to_owned();
        let headers = headers
            .iter()
            .map(|(name, value)| (name.as_str().to_owned(), value.to_str().unwrap_or_default().to_owned()))
            .collect();
        self.requests
            .lock()
            .expect("requests lock")
            .push(RecordedRequest { method: method.to_string(), path: path.clone(), headers, body });

        let canned = self
            .routes
            .lock()
            .expect("routes lock")
            .get(&(method.to_string(), path))
            .cloned();
        match canned {
            Some((status, body)) => (
                StatusCode::from_u16(status).expect("valid status"),
                [(header::CONTENT_TYPE, "application/json")],
                body,
            )
                .into_response(),
            None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
        }
    }
}

pub(crate) fn client_for(base_url: &str, storage: SharedStore) -> ApiClient {
    let config = ClientConfig::default().with_base_url(base_url);
    ApiClient::new(&config, storage).expect("test client should build")
}
