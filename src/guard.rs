//! Read-only session view for consumers that require a logged-in user.
//!
//! The "Authentication required" check runs once, when the guard is
//! mounted, and is never re-evaluated: a session that settles later does
//! not retroactively set the error. `is_authenticated` and the session half
//! of `is_loading` are read live.

use std::sync::Arc;

use crate::session::AuthSession;

pub const AUTH_REQUIRED: &str = "Authentication required";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardSnapshot {
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

pub struct AuthGuard {
    session: Arc<AuthSession>,
    local_loading: bool,
    mounted: bool,
    error: Option<String>,
}

impl AuthGuard {
    /// Create an unmounted guard. It reports loading until [`Self::mount`].
    #[must_use]
    pub fn new(session: Arc<AuthSession>) -> Self {
        Self { session, local_loading: true, mounted: false, error: None }
    }

    /// Create and mount in one step.
    #[must_use]
    pub fn attach(session: Arc<AuthSession>) -> Self {
        let mut guard = Self::new(session);
        guard.mount();
        guard
    }

    /// Run the one-time check. Later calls are no-ops.
    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        if self.session.is_initialized() && !self.session.is_authenticated() {
            tracing::debug!("guarded view mounted without an authenticated session");
            self.error = Some(AUTH_REQUIRED.to_owned());
        }
        self.local_loading = false;
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.local_loading || self.session.is_initializing()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn snapshot(&self) -> GuardSnapshot {
        GuardSnapshot {
            is_authenticated: self.is_authenticated(),
            is_loading: self.is_loading(),
            error: self.error.clone(),
        }
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
