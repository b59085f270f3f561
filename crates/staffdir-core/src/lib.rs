//! Core library for staffdir.
//!
//! - `auth`: credential storage, session coordination, external sign-in
//! - `api`: the authenticated REST client and typed employee endpoints
//! - `models`: employee records
//! - `config`: base URL, timeouts, and store selection
//! - `utils`: display formatting helpers

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError, ApiRequest, ApiResponse};
pub use auth::{CredentialStore, SessionCoordinator, SessionState, StorageError};
pub use config::Config;
