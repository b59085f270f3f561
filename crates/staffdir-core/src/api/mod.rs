//! REST API client module for the employee directory backend.
//!
//! `ApiClient` attaches the stored bearer token to every request and turns
//! a 401 response into session teardown (token cleared, expired flag set)
//! before handing the error back to the caller. The typed employee and
//! login endpoints live in `endpoints`.

pub mod client;
pub mod endpoints;
pub mod error;

pub use client::{ApiClient, ApiRequest, ApiResponse};
pub use endpoints::WriteOutcome;
pub use error::ApiError;
