use std::sync::Mutex;

use keyring::Entry;
use thiserror::Error;
use tracing::{debug, warn};

const SERVICE_NAME: &str = "staffdir";

/// Keyring account holding the bearer token
const TOKEN_KEY: &str = "token";

/// Keyring account holding the session-expired marker
const SESSION_EXPIRED_KEY: &str = "sessionExpired";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Keychain unavailable: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Session file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Credential store lock poisoned")]
    Poisoned,
}

/// Persistent storage for the session token and the session-expired flag.
///
/// Implementations are shared between the API client and the session
/// coordinator, so they take `&self` and synchronize internally.
pub trait CredentialStore: Send + Sync {
    fn get_token(&self) -> Result<Option<String>, StorageError>;

    /// Overwrite the stored token unconditionally
    fn set_token(&self, token: &str) -> Result<(), StorageError>;

    /// Remove the stored token. Succeeds when no token is present.
    fn clear_token(&self) -> Result<(), StorageError>;

    fn set_expired_flag(&self) -> Result<(), StorageError>;

    /// Read and clear the session-expired flag in one step
    fn consume_expired_flag(&self) -> Result<bool, StorageError>;

    /// The stored token, or `None` when absent, empty, or unreadable.
    fn token(&self) -> Option<String> {
        match self.get_token() {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read token, treating as signed out");
                None
            }
        }
    }

    fn has_token(&self) -> bool {
        self.token().is_some()
    }
}

/// Credential store backed by the OS keychain
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Use a different keychain service name (e.g. per environment)
    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, StorageError> {
        Ok(Entry::new(&self.service, key)?)
    }

    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringStore {
    fn get_token(&self) -> Result<Option<String>, StorageError> {
        self.read(TOKEN_KEY)
    }

    fn set_token(&self, token: &str) -> Result<(), StorageError> {
        self.entry(TOKEN_KEY)?.set_password(token)?;
        debug!("Token stored in keychain");
        Ok(())
    }

    fn clear_token(&self) -> Result<(), StorageError> {
        self.delete(TOKEN_KEY)
    }

    fn set_expired_flag(&self) -> Result<(), StorageError> {
        self.entry(SESSION_EXPIRED_KEY)?.set_password("true")?;
        Ok(())
    }

    fn consume_expired_flag(&self) -> Result<bool, StorageError> {
        let value = self.read(SESSION_EXPIRED_KEY)?;
        if value.is_some() {
            self.delete(SESSION_EXPIRED_KEY)?;
        }
        Ok(value.as_deref() == Some("true"))
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    token: Option<String>,
    session_expired: bool,
}

/// In-process credential store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a token already present
    pub fn with_token(token: &str) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                token: Some(token.to_string()),
                session_expired: false,
            }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, StorageError> {
        self.state.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl CredentialStore for MemoryStore {
    fn get_token(&self) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.token.clone())
    }

    fn set_token(&self, token: &str) -> Result<(), StorageError> {
        self.lock()?.token = Some(token.to_string());
        Ok(())
    }

    fn clear_token(&self) -> Result<(), StorageError> {
        self.lock()?.token = None;
        Ok(())
    }

    fn set_expired_flag(&self) -> Result<(), StorageError> {
        self.lock()?.session_expired = true;
        Ok(())
    }

    fn consume_expired_flag(&self) -> Result<bool, StorageError> {
        Ok(std::mem::take(&mut self.lock()?.session_expired))
    }
}
