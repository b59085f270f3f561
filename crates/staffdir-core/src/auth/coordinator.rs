//! Session coordination: which side of the app the user belongs on.
//!
//! The coordinator runs at every check point (start-up, each command or
//! screen focus). A session-expired flag left behind by the API client wins
//! over a token that is still present; otherwise token presence decides.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};

use super::credentials::{CredentialStore, StorageError};
use super::sign_in::{SignInError, SignInProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
}

impl SessionState {
    pub fn is_authenticated(self) -> bool {
        self == SessionState::Authenticated
    }
}

/// Login through an external provider can fail on either side
#[derive(Debug, thiserror::Error)]
pub enum ExternalLoginError {
    #[error("No external sign-in provider configured")]
    NotConfigured,

    #[error(transparent)]
    SignIn(#[from] SignInError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub struct SessionCoordinator {
    store: Arc<dyn CredentialStore>,
    sign_in: Option<Arc<dyn SignInProvider>>,
    state: SessionState,
    expired: bool,
}

impl SessionCoordinator {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            sign_in: None,
            state: SessionState::Unauthenticated,
            expired: false,
        }
    }

    pub fn with_sign_in(mut self, provider: Arc<dyn SignInProvider>) -> Self {
        self.sign_in = Some(provider);
        self
    }

    /// State as of the last check, login or logout
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the last check was forced out by an expired session
    pub fn session_expired(&self) -> bool {
        self.expired
    }

    /// Decide the current region from the store.
    pub fn check(&mut self) -> SessionState {
        self.expired = match self.store.consume_expired_flag() {
            Ok(flag) => flag,
            Err(e) => {
                warn!(error = %e, "Failed to read session-expired flag");
                false
            }
        };

        self.state = if self.expired {
            info!("Session expired, signing out");
            // A failed clear during 401 teardown may have left the token behind
            if let Err(e) = self.store.clear_token() {
                warn!(error = %e, "Failed to clear stale token");
            }
            SessionState::Unauthenticated
        } else if self.store.has_token() {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        };

        debug!(state = ?self.state, expired = self.expired, "Session check");
        self.state
    }

    /// Log in with username and password and store the issued token.
    pub async fn login(
        &mut self,
        api: &ApiClient,
        username: &str,
        password: &str,
    ) -> Result<SessionState, ApiError> {
        if username.trim().is_empty() {
            return Err(ApiError::MissingInput("username"));
        }
        if password.is_empty() {
            return Err(ApiError::MissingInput("password"));
        }

        let token = api.login(username.trim(), password).await?;
        self.establish(&token)?;
        Ok(self.state)
    }

    /// Log in through the external sign-in provider.
    pub async fn login_with_sign_in(
        &mut self,
        api: &ApiClient,
    ) -> Result<SessionState, ExternalLoginError> {
        let provider = self.sign_in.clone().ok_or(ExternalLoginError::NotConfigured)?;
        let grant = provider.sign_in().await?;
        debug!(email = ?grant.email, "External sign-in completed");

        let token = api.login_with_google(&grant.id_token).await?;
        self.establish(&token).map_err(ApiError::from)?;
        Ok(self.state)
    }

    fn establish(&mut self, token: &str) -> Result<(), StorageError> {
        self.store.set_token(token)?;
        // A fresh login supersedes any expiry seen before it
        if let Err(e) = self.store.consume_expired_flag() {
            warn!(error = %e, "Failed to clear session-expired flag");
        }
        self.expired = false;
        self.state = SessionState::Authenticated;
        info!("Session established");
        Ok(())
    }

    /// Sign out. The external revoke is attempted but never blocks the
    /// transition; a failure to clear the token is returned after the state
    /// has already moved to `Unauthenticated`.
    pub async fn logout(&mut self) -> Result<SessionState, StorageError> {
        if let Some(provider) = self.sign_in.clone() {
            if let Err(e) = provider.revoke().await {
                warn!(error = %e, "External sign-in revoke failed, continuing logout");
            }
        }

        self.state = SessionState::Unauthenticated;
        self.expired = false;
        self.store.clear_token()?;
        info!("Logged out");
        Ok(self.state)
    }
}
