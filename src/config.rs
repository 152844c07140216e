//! Client configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "https://localhost:7095";
pub const DEFAULT_STORAGE_FILE: &str = ".tinylink/storage.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportTimeouts {
    pub request_secs: Option<u64>,
    pub connect_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub storage_path: Option<PathBuf>,
    pub accept_invalid_certs: bool,
    pub timeouts: TransportTimeouts,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_owned(),
            storage_path: None,
            accept_invalid_certs: false,
            timeouts: TransportTimeouts::default(),
        }
    }
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `API_BASE_URL`: default `https://localhost:7095`
    /// - `TINYLINK_STORAGE_PATH`: persistent storage file, else `$HOME/.tinylink/storage.json`
    /// - `TINYLINK_ACCEPT_INVALID_CERTS`: `true`/`1` for self-signed dev hosts
    /// - `TINYLINK_REQUEST_TIMEOUT_SECS`, `TINYLINK_CONNECT_TIMEOUT_SECS`: unset by default
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = std::env::var("API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_owned());
        let storage_path = std::env::var("TINYLINK_STORAGE_PATH")
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .or_else(default_storage_path);
        let accept_invalid_certs = parse_flag(std::env::var("TINYLINK_ACCEPT_INVALID_CERTS").ok().as_deref());
        let timeouts = TransportTimeouts {
            request_secs: env_parse_u64("TINYLINK_REQUEST_TIMEOUT_SECS"),
            connect_secs: env_parse_u64("TINYLINK_CONNECT_TIMEOUT_SECS"),
        };

        Self { base_url: normalize_base_url(&base_url), storage_path, accept_invalid_certs, timeouts }
    }

    /// Replace the base URL, trimming any trailing slash.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = normalize_base_url(base_url);
        self
    }
}

/// `$HOME/.tinylink/storage.json`, or `None` when there is no home directory.
#[must_use]
pub fn default_storage_path() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(|home| PathBuf::from(home).join(DEFAULT_STORAGE_FILE))
}

fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() { DEFAULT_API_BASE_URL.to_owned() } else { trimmed.to_owned() }
}

fn parse_flag(raw: Option<&str>) -> bool {
    matches!(raw.map(str::trim), Some("1" | "true" | "TRUE" | "yes"))
}

fn env_parse_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse::<u64>().ok())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
