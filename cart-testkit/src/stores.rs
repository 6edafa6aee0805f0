//! Store wrappers that inject failures or latency in front of a real store.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use cart_store::{KeyValueStore, StoreError};

// =============================================================================
// FlakyStore
// =============================================================================

/// Wraps a store and fails reads or writes on demand.
pub struct FlakyStore<S> {
    inner: S,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    failing_writes_left: AtomicU32,
    write_attempts: AtomicU32,
}

impl<S: KeyValueStore> FlakyStore<S> {
    /// Wrap `inner`; nothing fails until configured.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            failing_writes_left: AtomicU32::new(0),
            write_attempts: AtomicU32::new(0),
        }
    }

    /// Make every `get` fail.
    pub fn fail_reads(self) -> Self {
        self.fail_reads.store(true, Ordering::SeqCst);
        self
    }

    /// Make every `set` fail.
    pub fn fail_writes(self) -> Self {
        self.fail_writes.store(true, Ordering::SeqCst);
        self
    }

    /// Make the next `count` calls to `set` fail, then recover.
    pub fn fail_next_writes(self, count: u32) -> Self {
        self.failing_writes_left.store(count, Ordering::SeqCst);
        self
    }

    /// Number of `set` calls seen, failed or not.
    pub fn write_attempts(&self) -> u32 {
        self.write_attempts.load(Ordering::SeqCst)
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn take_write_failure(&self) -> bool {
        if self.fail_writes.load(Ordering::SeqCst) {
            return true;
        }
        self.failing_writes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl<S: KeyValueStore> KeyValueStore for FlakyStore<S> {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable(format!("injected read failure for {key}")));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        if self.take_write_failure() {
            return Err(StoreError::unavailable(format!("injected write failure for {key}")));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key).await
    }
}

// =============================================================================
// SlowStore
// =============================================================================

/// Wraps a store and delays calls.
///
/// Reads wait a fixed delay. Writes consume a queue of delays, one per call,
/// so a test can make an early write land after a later one.
pub struct SlowStore<S> {
    inner: S,
    read_delay: Duration,
    write_delays: Mutex<VecDeque<Duration>>,
}

impl<S: KeyValueStore> SlowStore<S> {
    /// Wrap `inner` with no delays.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            read_delay: Duration::ZERO,
            write_delays: Mutex::new(VecDeque::new()),
        }
    }

    /// Delay every `get` by `delay`.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    /// Delay successive `set` calls by the given durations, in order.
    pub fn with_write_delays(self, delays: impl IntoIterator<Item = Duration>) -> Self {
        self.write_delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(delays);
        self
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: KeyValueStore> KeyValueStore for SlowStore<S> {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if !self.read_delay.is_zero() {
            tokio::time::sleep(self.read_delay).await;
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let delay = self
            .write_delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cart_store::MemoryStore;

    #[tokio::test]
    async fn test_fail_next_writes_recovers() {
        let store = FlakyStore::new(MemoryStore::new()).fail_next_writes(2);

        assert!(store.set("k", "1").await.is_err());
        assert!(store.set("k", "2").await.is_err());
        assert!(store.set("k", "3").await.is_ok());

        assert_eq!(store.write_attempts(), 3);
        assert_eq!(store.inner().peek("k").as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_fail_reads() {
        let store = FlakyStore::new(MemoryStore::with_entry("k", "v")).fail_reads();
        assert!(matches!(store.get("k").await, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_store_write_delays_are_consumed_in_order() {
        let store = SlowStore::new(MemoryStore::new())
            .with_write_delays([Duration::from_millis(50)]);

        let started = tokio::time::Instant::now();
        store.set("k", "1").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));

        let started = tokio::time::Instant::now();
        store.set("k", "2").await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(50));
    }
}
