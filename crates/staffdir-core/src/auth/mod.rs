//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `CredentialStore`: token and session-expired flag storage, backed by
//!   the OS keychain (`KeyringStore`), a session file (`FileStore`), or
//!   memory (`MemoryStore`)
//! - `SessionCoordinator`: decides whether the user is signed in at each
//!   check point, handles login and logout
//! - `SignInProvider`: seam for third-party sign-in

pub mod coordinator;
pub mod credentials;
pub mod session;
pub mod sign_in;

pub use coordinator::{ExternalLoginError, SessionCoordinator, SessionState};
pub use credentials::{CredentialStore, KeyringStore, MemoryStore, StorageError};
pub use session::{FileStore, SessionData};
pub use sign_in::{SignInError, SignInGrant, SignInProvider};
