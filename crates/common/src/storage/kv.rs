//! General-purpose key/value storage
//!
//! Unlike the secure element these stores have no practical size limit and
//! no confidentiality guarantee. They hold ciphertext for the encrypted token
//! store and plaintext for the browser-style store.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::error::{StorageError, StorageResult};
use crate::error::CommonError;

/// Synchronous string key/value storage
pub trait KeyValueStore: Send + Sync {
    /// Read `key`; `Ok(None)` when it was never written or was removed.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write (or overwrite) `key`.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key`; removing a missing key succeeds.
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Process-lifetime store
///
/// Clones share the same map, so a clone can be handed to a second client to
/// simulate shared browser storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Whether `key` holds a value.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// JSON-map store persisted to a single file
///
/// The map is loaded once on open and rewritten in full on every mutation,
/// first to `<path>.tmp` and then renamed over the original.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileKeyValueStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// # Errors
    /// `StorageError::Io` when the file exists but cannot be read and
    /// `StorageError::Corrupt` when it is not a JSON object of strings.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => HashMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StorageError::Corrupt(format!("{}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), entries = entries.len(), "Opened file key/value store");

        Ok(Self { path, entries: Mutex::new(entries) })
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &HashMap<String, String>) -> StorageResult<()> {
        let data = serde_json::to_vec_pretty(entries)?;

        // Write to temporary file first for atomicity
        let temp_path = self.path.with_extension("tmp");

        if let Some(parent) = temp_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.path).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "Failed to replace store file");
            StorageError::Common(CommonError::persistence_op("rename", e.to_string()))
        })?;

        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock();
        let previous = entries.insert(key.to_string(), value.to_string());

        if let Err(e) = self.persist(&entries) {
            // Keep memory consistent with disk
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock();
        let Some(previous) = entries.remove(key) else {
            return Ok(());
        };

        if let Err(e) = self.persist(&entries) {
            entries.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for storage::kv.
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_clones_share_entries() {
        let store = MemoryKeyValueStore::new();
        let clone = store.clone();

        store.set("a", "1").unwrap();
        assert_eq!(clone.get("a").unwrap().as_deref(), Some("1"));

        clone.remove("a").unwrap();
        clone.remove("a").unwrap();
        assert!(store.is_empty());
    }

    /// Validates `FileKeyValueStore` behavior for the reopen scenario.
    ///
    /// Assertions:
    /// - Confirms values survive closing and reopening the store.
    /// - Ensures removed keys stay removed after reopen.
    /// - Ensures no temporary file is left behind.
    #[test]
    fn test_file_store_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("tokens.json");

        {
            let store = FileKeyValueStore::open(&path).unwrap();
            store.set("forceauth:C1:accessToken", "AT1").unwrap();
            store.set("forceauth:C1:refreshToken", "RT1").unwrap();
            store.remove("forceauth:C1:refreshToken").unwrap();
        }

        let reopened = FileKeyValueStore::open(&path).unwrap();
        assert_eq!(reopened.get("forceauth:C1:accessToken").unwrap().as_deref(), Some("AT1"));
        assert_eq!(reopened.get("forceauth:C1:refreshToken").unwrap(), None);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, b"not json").unwrap();

        let result = FileKeyValueStore::open(&path);
        assert!(matches!(result, Err(StorageError::Corrupt(_))));
    }

    #[test]
    fn test_file_store_empty_file_is_empty_map() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, b"").unwrap();

        let store = FileKeyValueStore::open(&path).unwrap();
        assert_eq!(store.get("anything").unwrap(), None);
    }
}
