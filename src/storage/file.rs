//! JSON-file backed store, the CLI's equivalent of browser local storage.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{KeyValueStore, StorageError};

/// Stores all keys in one JSON object on disk.
///
/// Every write replaces the file through a temp file in the same directory,
/// so a crash never leaves a half-written session behind.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| StorageError::Corrupt(e.to_string()))
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| self.io_error(e))?;

        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.io_error(e))?;
        tmp.write_all(&json).map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        // A corrupt file is replaced rather than blocking every later write
        let mut entries = match self.read_all() {
            Ok(entries) => entries,
            Err(StorageError::Corrupt(reason)) => {
                tracing::warn!(path = %self.path.display(), reason = %reason, "Resetting corrupt session store");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("session.json"));
        assert_eq!(store.get("auth_token").unwrap(), None);
        store.remove("auth_token").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_values_persist_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileStore::new(&path);
        store.set("auth_token", "abc").unwrap();
        store.set("refresh_token", "def").unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get("auth_token").unwrap().as_deref(), Some("abc"));
        reopened.remove("auth_token").unwrap();
        assert_eq!(store.get("auth_token").unwrap(), None);
        assert_eq!(store.get("refresh_token").unwrap().as_deref(), Some("def"));
    }

    #[test]
    fn test_corrupt_file_is_reported_then_replaced_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(store.get("k"), Err(StorageError::Corrupt(_))));

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }
}
