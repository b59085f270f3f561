//! External sign-in for the command line.
//!
//! A terminal cannot run the provider's interactive flow, so the identity
//! token is obtained elsewhere and handed over through the environment.

use async_trait::async_trait;
use staffdir_core::auth::{SignInError, SignInGrant, SignInProvider};

pub const ID_TOKEN_ENV: &str = "STAFFDIR_GOOGLE_ID_TOKEN";

pub struct EnvSignIn;

#[async_trait]
impl SignInProvider for EnvSignIn {
    async fn sign_in(&self) -> Result<SignInGrant, SignInError> {
        match std::env::var(ID_TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => Ok(SignInGrant {
                id_token: token.trim().to_string(),
                email: None,
            }),
            Ok(_) => Err(SignInError::Cancelled),
            Err(_) => Err(SignInError::ServiceUnavailable(format!(
                "{} is not set",
                ID_TOKEN_ENV
            ))),
        }
    }

    /// Nothing is held locally on the provider side
    async fn revoke(&self) -> Result<(), SignInError> {
        Ok(())
    }
}
