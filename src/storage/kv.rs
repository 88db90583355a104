//! Durable key/value stores
//!
//! Each `get`/`set` is a single independent operation; nothing couples two
//! keys together.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Errors raised by a durable store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode value for '{key}': {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
}

/// Generic get/set by string key
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

/// Store persisted as one JSON object on disk
///
/// Writes go to a sibling temp file first and are renamed into place. A
/// corrupt file reads as empty.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Map<String, Value>, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        match serde_json::from_str::<Map<String, Value>>(&contents) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!(path = ?self.path, ?e, "state file is corrupt, starting empty");
                Ok(Map::new())
            }
        }
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut map = self.load().await?;
        map.insert(key.to_string(), value);

        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let encoded = serde_json::to_vec_pretty(&map).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, encoded).await.map_err(write_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(write_err)?;

        debug!(key, path = ?self.path, "state written");
        Ok(())
    }
}

/// Volatile store, for tests and dry runs
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.values.lock().await.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("state.json");

        let store = JsonFileStore::new(&path);
        assert_eq!(store.get("nextSwitchMode").await.unwrap(), None);

        store.set("nextSwitchMode", json!("transparency")).await.unwrap();
        store.set("lastCommandExecutedAt", json!(1_700_000_000_000_i64)).await.unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(
            reopened.get("nextSwitchMode").await.unwrap(),
            Some(json!("transparency"))
        );
        assert_eq!(
            reopened.get("lastCommandExecutedAt").await.unwrap(),
            Some(json!(1_700_000_000_000_i64))
        );
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_store_corrupt_file_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert_eq!(store.get("nextSwitchMode").await.unwrap(), None);

        store.set("nextSwitchMode", json!("adaptive")).await.unwrap();
        assert_eq!(store.get("nextSwitchMode").await.unwrap(), Some(json!("adaptive")));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        tokio_test::assert_ok!(store.set("k", json!(1)).await);
        assert_eq!(store.get("k").await.unwrap(), Some(json!(1)));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }
}
