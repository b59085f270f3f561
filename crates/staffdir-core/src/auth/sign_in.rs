use async_trait::async_trait;
use thiserror::Error;

/// Why an external sign-in attempt did not produce a grant
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignInError {
    #[error("Sign-in was cancelled")]
    Cancelled,

    #[error("A sign-in is already in progress")]
    InProgress,

    #[error("Sign-in service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Sign-in failed: {0}")]
    Other(String),
}

/// Result of a successful external sign-in
#[derive(Debug, Clone)]
pub struct SignInGrant {
    /// Identity token to exchange with the backend at `/auth/google`
    pub id_token: String,
    pub email: Option<String>,
}

/// A third-party identity provider (e.g. Google Sign-In).
///
/// The session coordinator only sees this trait, never a concrete SDK.
#[async_trait]
pub trait SignInProvider: Send + Sync {
    async fn sign_in(&self) -> Result<SignInGrant, SignInError>;

    /// Revoke the provider-side session. Called best-effort on logout.
    async fn revoke(&self) -> Result<(), SignInError>;
}
