use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::credentials::{CredentialStore, StorageError};

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// On-disk session record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionData {
    pub token: Option<String>,
    #[serde(default)]
    pub session_expired: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Credential store persisted as JSON in the cache directory.
///
/// Used where no OS keychain is available (headless hosts, CI).
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            path: cache_dir.join(SESSION_FILE),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<SessionData, StorageError> {
        if !self.path.exists() {
            return Ok(SessionData::default());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, data: &SessionData) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(data)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    fn update<T>(&self, f: impl FnOnce(&mut SessionData) -> T) -> Result<T, StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut data = self.load()?;
        let out = f(&mut data);
        data.updated_at = Some(Utc::now());
        self.save(&data)?;
        Ok(out)
    }
}

impl CredentialStore for FileStore {
    fn get_token(&self) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(self.load()?.token)
    }

    fn set_token(&self, token: &str) -> Result<(), StorageError> {
        self.update(|data| data.token = Some(token.to_string()))?;
        debug!(path = %self.path.display(), "Token saved to session file");
        Ok(())
    }

    fn clear_token(&self) -> Result<(), StorageError> {
        if !self.path.exists() {
            return Ok(());
        }
        self.update(|data| data.token = None)
    }

    fn set_expired_flag(&self) -> Result<(), StorageError> {
        self.update(|data| data.session_expired = true)
    }

    fn consume_expired_flag(&self) -> Result<bool, StorageError> {
        if !self.path.exists() {
            return Ok(false);
        }
        self.update(|data| std::mem::take(&mut data.session_expired))
    }
}
