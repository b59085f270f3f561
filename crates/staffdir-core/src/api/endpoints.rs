//! Typed login and employee endpoints on top of `ApiClient::send_request`.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::{Employee, NewEmployee};

use super::{ApiClient, ApiError};

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct IdTokenRequest<'a> {
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Body of a successful create or update.
///
/// Some backends echo the stored record, others only acknowledge with a
/// message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WriteOutcome {
    Record(Employee),
    Acknowledged {
        #[serde(default)]
        message: Option<String>,
    },
}

impl WriteOutcome {
    pub fn record(&self) -> Option<&Employee> {
        match self {
            WriteOutcome::Record(employee) => Some(employee),
            WriteOutcome::Acknowledged { .. } => None,
        }
    }
}

impl ApiClient {
    /// Exchange username and password for a bearer token.
    ///
    /// Sent without any stored token, and a 401 here means bad credentials,
    /// so the current session is left alone. The token is returned, not
    /// stored; the session coordinator owns that.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let response = self
            .post_unauthenticated("/login", &LoginRequest { username, password })
            .await?;
        let TokenResponse { token } = response.json()?;
        info!(username, "Login accepted");
        Ok(token)
    }

    /// Exchange a third-party identity token for a bearer token
    pub async fn login_with_google(&self, id_token: &str) -> Result<String, ApiError> {
        let response = self
            .post_unauthenticated("/auth/google", &IdTokenRequest { token: id_token })
            .await?;
        let TokenResponse { token } = response.json()?;
        info!("External sign-in accepted");
        Ok(token)
    }

    pub async fn list_employees(&self) -> Result<Vec<Employee>, ApiError> {
        self.get_json("/employees").await
    }

    pub async fn create_employee(&self, employee: &NewEmployee) -> Result<WriteOutcome, ApiError> {
        if let Some(field) = employee.missing_field() {
            return Err(ApiError::MissingInput(field));
        }
        self.send_json(Method::POST, "/employees", employee)
            .await?
            .json()
    }

    pub async fn update_employee(&self, employee: &Employee) -> Result<WriteOutcome, ApiError> {
        if let Some(field) = employee.details.missing_field() {
            return Err(ApiError::MissingInput(field));
        }
        let path = format!("/employees/{}", employee.id);
        self.send_json(Method::PUT, &path, employee).await?.json()
    }

    /// Delete a record. Whatever body the backend returns is ignored.
    pub async fn delete_employee(&self, id: i64) -> Result<(), ApiError> {
        let path = format!("/employees/{}", id);
        self.send(Method::DELETE, &path, None).await?;
        Ok(())
    }
}
