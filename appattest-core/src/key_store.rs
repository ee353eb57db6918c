//! Device key identifier persistence
//!
//! The only local state that outlives a session is the opaque key identifier
//! returned by the attestation provider. Two stores are provided:
//! - [`MemoryKeyStore`] (process lifetime, used in tests)
//! - [`FileKeyStore`] (a small JSON file, used by the CLI)

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AttestError, Result};

/// A persisted device key identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredKey {
    pub key_id: String,
    pub created_at: DateTime<Utc>,
}

impl StoredKey {
    pub fn new(key_id: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            created_at: Utc::now(),
        }
    }
}

/// Storage for the device key identifier.
pub trait KeyStore: Send + Sync {
    fn load(&self) -> Result<Option<StoredKey>>;

    fn save(&self, key: &StoredKey) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

/// In-memory key store
#[derive(Default)]
pub struct MemoryKeyStore {
    key: RwLock<Option<StoredKey>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with an existing key identifier.
    pub fn with_key(key_id: impl Into<String>) -> Self {
        Self {
            key: RwLock::new(Some(StoredKey::new(key_id))),
        }
    }
}

impl KeyStore for MemoryKeyStore {
    fn load(&self) -> Result<Option<StoredKey>> {
        self.key
            .read()
            .map(|key| key.clone())
            .map_err(|_| AttestError::KeyStore("Key store lock poisoned".into()))
    }

    fn save(&self, key: &StoredKey) -> Result<()> {
        let mut slot = self
            .key
            .write()
            .map_err(|_| AttestError::KeyStore("Key store lock poisoned".into()))?;
        *slot = Some(key.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self
            .key
            .write()
            .map_err(|_| AttestError::KeyStore("Key store lock poisoned".into()))?;
        *slot = None;
        Ok(())
    }
}

/// JSON file key store
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyStore for FileKeyStore {
    fn load(&self) -> Result<Option<StoredKey>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AttestError::KeyStore(format!(
                    "Failed to read key file {}: {e}",
                    self.path.display()
                )))
            }
        };

        let key: StoredKey = serde_json::from_slice(&bytes).map_err(|e| {
            AttestError::KeyStore(format!(
                "Failed to parse key file {}: {e}",
                self.path.display()
            ))
        })?;

        debug!(path = %self.path.display(), "Loaded device key");
        Ok(Some(key))
    }

    fn save(&self, key: &StoredKey) -> Result<()> {
        let json = serde_json::to_vec_pretty(key)
            .map_err(|e| AttestError::KeyStore(format!("Failed to serialize key: {e}")))?;

        // Write then rename so a crash never leaves a truncated key file
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(|e| {
            AttestError::KeyStore(format!("Failed to write key file {}: {e}", tmp.display()))
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            AttestError::KeyStore(format!(
                "Failed to move key file into {}: {e}",
                self.path.display()
            ))
        })?;

        debug!(path = %self.path.display(), "Saved device key");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AttestError::KeyStore(format!(
                "Failed to remove key file {}: {e}",
                self.path.display()
            ))),
        }
    }
}
