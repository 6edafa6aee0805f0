//! Key-value store trait definition (Port)
//!
//! The cart only needs string values keyed by string. Implementations can be
//! a JSON file, in-memory, or a wrapper that injects failures for testing.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;

/// Async key-value byte store keyed by string.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, `None` if absent
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key).await
    }
}
