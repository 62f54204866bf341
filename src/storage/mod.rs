//! Key-value persistence for session state.
//!
//! The session layer only needs `get`/`set`/`remove` on string keys. Values
//! that are not plain strings round-trip through JSON via
//! [`get_json`](dyn KeyValueStore::get_json) and
//! [`set_json`](dyn KeyValueStore::set_json).

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on session store {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Session store is corrupt: {0}")]
    Corrupt(String),

    #[error("Value for key '{key}' could not be encoded: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl dyn KeyValueStore {
    /// Read and decode a JSON value. Undecodable values read as absent.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let Some(raw) = self.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key = key, error = %e, "Discarding undecodable stored value");
                Ok(None)
            }
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.set(key, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::Arc;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Snapshot {
        name: String,
        count: u32,
    }

    #[test]
    fn test_json_values_round_trip() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let snap = Snapshot {
            name: "front page".to_string(),
            count: 3,
        };
        store.set_json("snap", &snap).unwrap();
        assert_eq!(store.get_json::<Snapshot>("snap").unwrap(), Some(snap));
    }

    #[test]
    fn test_undecodable_json_reads_as_absent() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store.set("snap", "{not json").unwrap();
        assert_eq!(store.get_json::<Snapshot>("snap").unwrap(), None);
    }
}
