//! In-memory store implementation
//!
//! Used for testing and development without touching the filesystem.
//! Thread-safe using RwLock for concurrent access.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::repository::KeyValueStore;

/// In-memory key-value store
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    writes: AtomicU64,
}

impl MemoryStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            writes: AtomicU64::new(0),
        }
    }

    /// Create a store pre-seeded with one entry
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::new();
        store
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
        store
    }

    /// Get the number of keys
    pub fn key_count(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Get the number of completed `set` calls
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Read a value without going through the async port
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    /// Clear all data (useful for test setup)
    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
        self.writes.store(0, Ordering::SeqCst);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.peek(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_absent_key() {
        let store = MemoryStore::new();
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let store = MemoryStore::new();

        store.set("k", "v1").await.unwrap();
        store.set("k", "v2").await.unwrap();

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));
        assert_eq!(store.key_count(), 1);
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = MemoryStore::with_entry("k", "v");

        store.remove("k").await.unwrap();
        store.remove("k").await.unwrap();

        assert!(store.peek("k").is_none());
    }

    #[tokio::test]
    async fn test_clear() {
        let store = MemoryStore::new();
        store.set("a", "1").await.unwrap();
        store.set("b", "2").await.unwrap();

        store.clear();

        assert_eq!(store.key_count(), 0);
        assert_eq!(store.write_count(), 0);
    }
}
