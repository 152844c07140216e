//! # tinylink
//!
//! Client-side session and API access layer for the TinyLink URL shortener.
//!
//! - [`session::AuthSession`] owns the login state machine and delegates
//!   account I/O to an injected [`session::AuthStore`].
//! - [`guard::AuthGuard`] is the read-only view for protected consumers.
//! - [`api::ApiClient`] talks to the remote API, attaching the anonymous
//!   [`identity::ClientIdentity`] and any bearer token.

pub mod api;
pub mod config;
pub mod error;
pub mod guard;
pub mod identity;
pub mod session;
pub mod storage;
pub mod types;

pub use api::ApiClient;
pub use api::auth::HttpAuthStore;
pub use config::ClientConfig;
pub use error::ApiError;
pub use guard::{AuthGuard, GuardSnapshot};
pub use identity::ClientIdentity;
pub use session::{AuthSession, AuthStore, LifecycleFlags, SessionState};
pub use storage::{FileStore, KeyValueStore, MemoryStore, SharedStore};
pub use types::{OpResult, Role, User};
