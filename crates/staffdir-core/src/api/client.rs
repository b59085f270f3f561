//! Authenticated HTTP client for the employee directory backend.
//!
//! Every request reads the token from the shared `CredentialStore` and sends
//! it as a bearer credential when present. A 401 response clears the token
//! and sets the session-expired flag before the error is returned; there is
//! no refresh and no retry.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::CredentialStore;
use crate::config::Config;

use super::ApiError;

/// A request as seen by the client, before authentication is attached
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    /// Attach the stored token and treat a 401 as session expiry.
    /// Off for credential exchanges such as login.
    pub authenticated: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            authenticated: true,
        }
    }

    /// Send without the stored token. A 401 is then a plain rejection,
    /// not an expired session.
    pub fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }

    /// Attach a JSON body
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode request body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }
}

/// A successful (2xx) response. The body is passed through untouched.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    body: String,
}

impl ApiResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response: {}", e))
        })
    }
}

/// API client for the employee directory.
/// Clone is cheap - reqwest::Client and the store are both behind Arcs.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: Arc<dyn CredentialStore>,
}

impl ApiClient {
    /// Create a client for the configured base URL
    pub fn new(config: &Config, store: Arc<dyn CredentialStore>) -> Result<Self, ApiError> {
        Self::with_base_url(&config.api_url, config.request_timeout(), store)
    }

    pub fn with_base_url(
        base_url: &str,
        timeout: Duration,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request once, with authentication and 401 handling.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ApiError> {
        let request = ApiRequest {
            method,
            path: path.to_string(),
            body: body.cloned(),
            authenticated: true,
        };
        self.send_request(&request, false).await
    }

    /// Send a request. `already_retried` marks a replay of a request that
    /// has already been through 401 handling, so teardown is not repeated.
    pub async fn send_request(
        &self,
        request: &ApiRequest,
        already_retried: bool,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.url(&request.path);
        let mut builder = self.client.request(request.method.clone(), &url);

        let token = if request.authenticated {
            self.store.token()
        } else {
            None
        };
        let authenticated = match token {
            Some(token) => {
                builder = builder.bearer_auth(token);
                true
            }
            None => false,
        };

        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        debug!(method = %request.method, url = %url, authenticated, "Sending request");

        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            return Ok(ApiResponse { status, body });
        }

        debug!(method = %request.method, url = %url, status = status.as_u16(), "Request failed");

        // The status alone decides teardown; the body may never arrive
        if status == StatusCode::UNAUTHORIZED && request.authenticated && !already_retried {
            self.expire_session();
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(status, &body))
    }

    /// Tear down the local session after the backend rejected the token
    fn expire_session(&self) {
        warn!("Received 401, ending session");
        if let Err(e) = self.store.clear_token() {
            warn!(error = %e, "Failed to clear token after 401");
        }
        if let Err(e) = self.store.set_expired_flag() {
            warn!(error = %e, "Failed to set session-expired flag");
        }
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_request(&ApiRequest::new(Method::GET, path), false)
            .await?
            .json()
    }

    pub(crate) async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError> {
        let request = ApiRequest::new(method, path).json(body)?;
        self.send_request(&request, false).await
    }

    /// POST a credential exchange: no bearer token, no 401 teardown
    pub(crate) async fn post_unauthenticated<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError> {
        let request = ApiRequest::new(Method::POST, path).json(body)?.unauthenticated();
        self.send_request(&request, false).await
    }
}
