//! File-backed store implementation
//!
//! Keeps every key in a single JSON object on disk:
//!
//! ```text
//! {
//!   "@GoMarketplace:cart": "[{\"id\":\"a\",...}]"
//! }
//! ```
//!
//! Writes go to a sibling temp file first and are renamed into place, so a
//! crash mid-write leaves the previous file intact. Access within one process
//! is serialized by an async mutex; there is no cross-process locking.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StoreError;
use crate::repository::KeyValueStore;

type Entries = BTreeMap<String, String>;

/// JSON-file key-value store
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Create a store backed by `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    async fn load(&self) -> Result<Entries, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Store file not found, starting empty");
                return Ok(Entries::new());
            }
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        if content.trim().is_empty() {
            return Ok(Entries::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            StoreError::Deserialization(format!("{}: {}", self.path.display(), e))
        })
    }

    async fn save(&self, entries: &Entries) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| StoreError::io(parent, e))?;
        }

        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, content)
            .await
            .map_err(|e| StoreError::io(&temp_path, e))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;

        debug!(path = %self.path.display(), keys = entries.len(), "Store file written");
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().await;
        let entries = self.load().await?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        if entries.remove(key).is_some() {
            self.save(&entries).await?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("store.json"));

        assert!(store.get("k").await.unwrap().is_none());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_set_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store.json");

        FileStore::new(&path).set("k", "v").await.unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("store.json"));

        store.set("a", "1").await.unwrap();
        store.set("b", "2").await.unwrap();
        store.remove("a").await.unwrap();

        assert!(store.get("a").await.unwrap().is_none());
        assert_eq!(store.get("b").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("store.json"));

        store.set("k", "v").await.unwrap();

        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        let result = FileStore::new(&path).get("k").await;
        assert!(matches!(result, Err(StoreError::Deserialization(_))));
    }
}
