//! Pluggable key-value persistence
//!
//! All user state (API keys, model choices, sessions) lives behind the
//! [`KvStore`] trait. Semantics are deliberately weak: last write
//! wins, no transactions, and a failed read degrades to "absent"
//! rather than an error.

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::warn;

/// Synchronous key-value store with last-write-wins semantics
pub trait KvStore: Send + Sync {
    /// Read a key; `None` when absent or unreadable
    fn get(&self, key: &str) -> Option<String>;

    /// Write a key, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key; removing an absent key is not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory store for tests and embedding
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("store lock poisoned"))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("store lock poisoned"))?
            .remove(key);
        Ok(())
    }
}

/// One file per key under a root directory
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Reject keys that could escape the root directory
    fn validate_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(anyhow!("store key cannot be empty"));
        }
        if key.contains('/') || key.contains('\\') || key.contains("..") || key.contains('\0') {
            return Err(anyhow!("store key '{key}' contains invalid characters"));
        }
        Ok(())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        if let Err(e) = Self::validate_key(key) {
            warn!("Rejected store read: {e}");
            return None;
        }
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Some(value),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Failed to read store key '{key}': {e}");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        Self::validate_key(key)?;
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        Self::validate_key(key)?;
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
