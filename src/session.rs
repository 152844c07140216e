//! Authenticated session: who is logged in, and whether that answer can be
//! trusted yet.
//!
//! DESIGN
//! ======
//! `AuthSession` owns the lifecycle flags and delegates token/user storage
//! and network I/O to an injected [`AuthStore`]. Sessions are constructed
//! explicitly, so tests and embedders can run several side by side.
//!
//! Lifecycle: Uninitialized -> Initializing -> Settled. `login`, `register`
//! and `check_auth_status` raise `is_initializing` for their duration; only
//! a completed `check_auth_status` marks the session settled. Profile and
//! password changes leave the flags alone so they never trigger a
//! session-wide loading state.
//!
//! ERROR HANDLING
//! ==============
//! Lifecycle and account operations never fail: they return an [`OpResult`]
//! with a readable message. `toggle_two_factor_auth` is the exception and
//! returns the [`ApiError`] to its caller.

use std::sync::Arc;

use tokio::sync::watch;

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::types::{
    ChangePasswordRequest, LoginRequest, OpResult, RegisterRequest, StoreOutcome, TwoFactorAuthResponse,
    TwoFactorRequest, UpdateProfileRequest, User,
};

const LOGIN_FAILED: &str = "Failed to log in";
const REGISTER_FAILED: &str = "Failed to register";
const UPDATE_PROFILE_FAILED: &str = "Failed to update profile";
const DELETE_ACCOUNT_FAILED: &str = "Failed to delete account";
const CHANGE_PASSWORD_FAILED: &str = "Failed to change password";
const TWO_FACTOR_FAILED: &str = "Failed to update two-factor authentication";

// =============================================================================
// STORE SEAM
// =============================================================================

/// Backing store for the session: holds the token and user record and
/// performs the account endpoints' network I/O. Enables mocking in tests.
#[async_trait::async_trait]
pub trait AuthStore: Send + Sync {
    fn token(&self) -> Option<String>;

    fn user(&self) -> Option<User>;

    /// A session counts as authenticated only with both a token and a user.
    fn is_authenticated(&self) -> bool {
        self.token().is_some() && self.user().is_some()
    }

    /// Load the user for the held token. Returns `Ok(None)` without a
    /// request when no token is held.
    async fn fetch_current_user(&self) -> Result<Option<User>, ApiError>;

    async fn login(&self, credentials: LoginRequest) -> Result<User, ApiError>;

    async fn register(&self, profile: RegisterRequest) -> Result<User, ApiError>;

    async fn update_profile(&self, changes: UpdateProfileRequest) -> Result<User, ApiError>;

    /// Clear the token and user. Network failures are the store's to handle.
    async fn logout(&self);

    async fn delete_account(&self) -> Result<StoreOutcome, ApiError>;

    async fn change_password(&self, request: ChangePasswordRequest) -> Result<OpResult, ApiError>;
}

// =============================================================================
// STATE
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleFlags {
    pub is_initializing: bool,
    pub is_initialized: bool,
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub is_authenticated: bool,
    pub is_initializing: bool,
    pub is_initialized: bool,
    pub user: Option<User>,
}

/// Releases `is_initializing` when dropped, including when the owning
/// future is dropped mid-request. Settles the session only if asked to.
struct InitializingGuard<'a> {
    flags: &'a watch::Sender<LifecycleFlags>,
    settle: bool,
}

impl<'a> InitializingGuard<'a> {
    fn enter(flags: &'a watch::Sender<LifecycleFlags>) -> Self {
        flags.send_modify(|f| f.is_initializing = true);
        Self { flags, settle: false }
    }

    fn settle_on_release(&mut self) {
        self.settle = true;
    }
}

impl Drop for InitializingGuard<'_> {
    fn drop(&mut self) {
        let settle = self.settle;
        self.flags.send_modify(|f| {
            f.is_initializing = false;
            if settle {
                f.is_initialized = true;
            }
        });
    }
}

// =============================================================================
// AUTH SESSION
// =============================================================================

pub struct AuthSession {
    store: Arc<dyn AuthStore>,
    api: ApiClient,
    flags: watch::Sender<LifecycleFlags>,
}

impl AuthSession {
    /// `api` is used for requests that bypass the store (two-factor toggle).
    #[must_use]
    pub fn new(store: Arc<dyn AuthStore>, api: ApiClient) -> Self {
        let (flags, _) = watch::channel(LifecycleFlags::default());
        Self { store, api, flags }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn AuthStore> {
        &self.store
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    #[must_use]
    pub fn is_initializing(&self) -> bool {
        self.flags.borrow().is_initializing
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.flags.borrow().is_initialized
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.store.user()
    }

    #[must_use]
    pub fn is_premium(&self) -> bool {
        self.store.user().is_some_and(|u| u.is_premium)
    }

    #[must_use]
    pub fn flags(&self) -> LifecycleFlags {
        *self.flags.borrow()
    }

    /// Watch the lifecycle flags for changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LifecycleFlags> {
        self.flags.subscribe()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        let flags = self.flags();
        let user = self.store.user();
        SessionState {
            is_authenticated: self.store.is_authenticated(),
            is_initializing: flags.is_initializing,
            is_initialized: flags.is_initialized,
            user,
        }
    }

    /// Resolve the session from any held token and mark it settled.
    ///
    /// Failures are logged and count as "not authenticated".
    pub async fn check_auth_status(&self) -> bool {
        let mut guard = InitializingGuard::enter(&self.flags);
        match self.store.fetch_current_user().await {
            Ok(Some(user)) if !user.email.is_empty() => {
                tracing::info!(
                    user_id = %user.id,
                    email = %user.email,
                    auth_provider = user.auth_provider.as_deref().unwrap_or("Not set"),
                    "user authenticated"
                );
            }
            Ok(Some(user)) => {
                tracing::warn!(user_id = %user.id, "user authenticated but data is incomplete");
            }
            Ok(None) => tracing::debug!("no session token, skipping user fetch"),
            Err(e) => tracing::error!(error = %e, "error checking authentication status"),
        }
        guard.settle_on_release();
        drop(guard);
        self.store.is_authenticated()
    }

    pub async fn login(&self, email: &str, password: &str) -> OpResult {
        let _guard = InitializingGuard::enter(&self.flags);
        let credentials = LoginRequest { email: email.to_owned(), password: password.to_owned(), remember: false };
        match self.store.login(credentials).await {
            Ok(_) => OpResult::ok(),
            Err(e) => OpResult::failed(failure_message(&e, LOGIN_FAILED)),
        }
    }

    pub async fn register(&self, profile: RegisterRequest) -> OpResult {
        let _guard = InitializingGuard::enter(&self.flags);
        match self.store.register(profile).await {
            Ok(_) => OpResult::ok(),
            Err(e) => OpResult::failed(failure_message(&e, REGISTER_FAILED)),
        }
    }

    /// Background mutation: does not touch the lifecycle flags.
    pub async fn update_profile(&self, changes: UpdateProfileRequest) -> OpResult {
        match self.store.update_profile(changes).await {
            Ok(_) => OpResult::ok(),
            Err(e) => OpResult::failed(failure_message(&e, UPDATE_PROFILE_FAILED)),
        }
    }

    pub async fn logout(&self) {
        self.store.logout().await;
    }

    /// The store's message becomes `message` on success and `error` on failure.
    pub async fn delete_account(&self) -> OpResult {
        match self.store.delete_account().await {
            Ok(StoreOutcome { success: true, message }) => OpResult::ok_with_message(message),
            Ok(StoreOutcome { success: false, message }) => {
                OpResult::failed(non_empty_or(message, DELETE_ACCOUNT_FAILED))
            }
            Err(e) => OpResult::failed(failure_message(&e, DELETE_ACCOUNT_FAILED)),
        }
    }

    /// The store's envelope is returned as-is; only a failure without a
    /// message gets the default one.
    pub async fn change_password(&self, request: ChangePasswordRequest) -> OpResult {
        match self.store.change_password(request).await {
            Ok(result) if result.success => result,
            Ok(mut result) => {
                let error = result.error.take().unwrap_or_default();
                result.error = Some(non_empty_or(error, CHANGE_PASSWORD_FAILED));
                result
            }
            Err(e) => OpResult::failed(failure_message(&e, CHANGE_PASSWORD_FAILED)),
        }
    }

    /// Enable or disable two-factor authentication for the current user.
    ///
    /// # Errors
    ///
    /// Propagates every failure: [`ApiError::MissingToken`] when logged out,
    /// otherwise the transport, status, or parse error of the request.
    pub async fn toggle_two_factor_auth(
        &self,
        enable: bool,
        code: Option<&str>,
    ) -> Result<TwoFactorAuthResponse, ApiError> {
        let result = self.send_two_factor(enable, code).await;
        if let Err(e) = &result {
            tracing::error!(error = %e, enable, "error toggling two-factor authentication");
        }
        result
    }

    async fn send_two_factor(&self, enable: bool, code: Option<&str>) -> Result<TwoFactorAuthResponse, ApiError> {
        let token = self.store.token().ok_or(ApiError::MissingToken)?;
        let request = self
            .api
            .http()
            .post(self.api.url("/api/users/two-factor-auth"))
            .bearer_auth(token)
            .json(&TwoFactorRequest { enable, code });
        self.api.send_json(request, TWO_FACTOR_FAILED).await
    }
}

fn failure_message(error: &ApiError, fallback: &str) -> String {
    non_empty_or(error.to_string(), fallback)
}

fn non_empty_or(message: String, fallback: &str) -> String {
    if message.trim().is_empty() { fallback.to_owned() } else { message }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
