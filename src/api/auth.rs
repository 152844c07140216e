//! Remote-API backed auth store: holds the token and user record and
//! performs the account endpoints' network I/O.
//!
//! DESIGN
//! ======
//! The token lives in memory and is mirrored to client-local storage under
//! [`TOKEN_KEY`] so a later process (or the remaining-requests query) sees
//! it. Token and user are replaced together on login/register and cleared
//! together on logout, account deletion, or a rejected token.

use std::sync::{Mutex, PoisonError};

use super::{ApiClient, parse_body};
use crate::error::ApiError;
use crate::session::AuthStore;
use crate::storage::TOKEN_KEY;
use crate::types::{
    AuthResponse, ChangePasswordRequest, LoginRequest, MessageResponse, OpResult, RegisterRequest, StoreOutcome,
    UpdateProfileRequest, User,
};

const ACCOUNT_DELETED: &str = "Account deleted";
const PASSWORD_CHANGED: &str = "Password changed";

pub struct HttpAuthStore {
    api: ApiClient,
    token: Mutex<Option<String>>,
    user: Mutex<Option<User>>,
}

impl HttpAuthStore {
    /// Create a store, picking up any token persisted by an earlier session.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        let token = api.stored_token();
        Self { api, token: Mutex::new(token), user: Mutex::new(None) }
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    fn require_token(&self) -> Result<String, ApiError> {
        self.token().ok_or(ApiError::MissingToken)
    }

    fn set_user(&self, user: Option<User>) {
        *self.user.lock().unwrap_or_else(PoisonError::into_inner) = user;
    }

    fn set_session(&self, token: String, user: User) {
        if let Some(storage) = self.api.storage() {
            if let Err(e) = storage.set(TOKEN_KEY, &token) {
                tracing::warn!(error = %e, "failed to persist session token");
            }
        }
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
        self.set_user(Some(user));
    }

    fn clear_session(&self) {
        if let Some(storage) = self.api.storage() {
            if let Err(e) = storage.remove(TOKEN_KEY) {
                tracing::warn!(error = %e, "failed to remove persisted session token");
            }
        }
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.set_user(None);
    }

    async fn exchange_credentials(
        &self,
        path: &str,
        body: &(impl serde::Serialize + Sync),
        fallback: &str,
    ) -> Result<User, ApiError> {
        let request = self.api.http().post(self.api.url(path)).json(body);
        let auth: AuthResponse = self.api.send_json(request, fallback).await?;
        let user = auth.user.clone();
        self.set_session(auth.token, auth.user);
        Ok(user)
    }
}

#[async_trait::async_trait]
impl AuthStore for HttpAuthStore {
    fn token(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn user(&self) -> Option<User> {
        self.user
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn fetch_current_user(&self) -> Result<Option<User>, ApiError> {
        let Some(token) = self.token() else {
            return Ok(None);
        };
        let request = self
            .api
            .http()
            .get(self.api.url("/api/auth/me"))
            .bearer_auth(token);
        match self.api.send_json::<User>(request, "Failed to load user").await {
            Ok(user) => {
                self.set_user(Some(user.clone()));
                Ok(Some(user))
            }
            Err(e) => {
                if e.is_unauthorized() {
                    tracing::info!("stored token rejected, clearing session");
                    self.clear_session();
                }
                Err(e)
            }
        }
    }

    async fn login(&self, credentials: LoginRequest) -> Result<User, ApiError> {
        self.exchange_credentials("/api/auth/login", &credentials, "Failed to log in")
            .await
    }

    async fn register(&self, profile: RegisterRequest) -> Result<User, ApiError> {
        self.exchange_credentials("/api/auth/register", &profile, "Failed to register")
            .await
    }

    async fn update_profile(&self, changes: UpdateProfileRequest) -> Result<User, ApiError> {
        let token = self.require_token()?;
        let request = self
            .api
            .http()
            .put(self.api.url("/api/users/profile"))
            .bearer_auth(token)
            .json(&changes);
        let user: User = self
            .api
            .send_json(request, "Failed to update profile")
            .await?;
        self.set_user(Some(user.clone()));
        Ok(user)
    }

    async fn logout(&self) {
        if let Some(token) = self.token() {
            let request = self
                .api
                .http()
                .post(self.api.url("/api/auth/logout"))
                .bearer_auth(token);
            if let Err(e) = self.api.send_text(request, "Failed to log out").await {
                tracing::warn!(error = %e, "logout request failed, clearing local session anyway");
            }
        }
        self.clear_session();
    }

    async fn delete_account(&self) -> Result<StoreOutcome, ApiError> {
        let token = self.require_token()?;
        let request = self
            .api
            .http()
            .delete(self.api.url("/api/users/me"))
            .bearer_auth(token);
        match self.api.send_text(request, "Failed to delete account").await {
            Ok(text) => {
                let body = parse_body::<Option<MessageResponse>>(&text).unwrap_or_default();
                self.clear_session();
                let message = body
                    .and_then(|b| b.message)
                    .unwrap_or_else(|| ACCOUNT_DELETED.to_owned());
                Ok(StoreOutcome { success: true, message })
            }
            Err(ApiError::Status { message, .. }) => Ok(StoreOutcome { success: false, message }),
            Err(e) => Err(e),
        }
    }

    async fn change_password(&self, request: ChangePasswordRequest) -> Result<OpResult, ApiError> {
        let token = self.require_token()?;
        let http_request = self
            .api
            .http()
            .post(self.api.url("/api/users/change-password"))
            .bearer_auth(token)
            .json(&request);
        match self.api.send_text(http_request, "Failed to change password").await {
            Ok(text) => {
                let message = parse_body::<Option<MessageResponse>>(&text)
                    .ok()
                    .flatten()
                    .and_then(|b| b.message)
                    .unwrap_or_else(|| PASSWORD_CHANGED.to_owned());
                Ok(OpResult::ok_with_message(message))
            }
            Err(ApiError::Status { message, .. }) => Ok(OpResult::failed(message)),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
