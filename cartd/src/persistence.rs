//! Snapshot persistence.
//!
//! Every state-changing mutation hands `(revision, state)` to the
//! [`SnapshotWriter`] in a freshly spawned task. Writes are serialized on an
//! async mutex together with the last written revision: a task that wakes up
//! holding an older revision than the one already stored skips its write, so
//! the store never moves backwards.
//!
//! What happens when the store rejects a write is decided by the injected
//! [`PersistPolicy`].

use std::sync::Arc;
use std::time::Duration;

use cart_domain::CartState;
use cart_store::KeyValueStore;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::error::CartResult;
use crate::event_bus::{CartEvent, EventBus};
use crate::snapshot;

// =============================================================================
// Policy
// =============================================================================

/// Failure handling for background snapshot writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistPolicy {
    /// Log the failure and keep going
    LogAndContinue,
    /// Retry with exponential backoff, then log and give up
    Retry {
        /// Total store calls, including the first
        max_attempts: u32,
        /// Wait before the second attempt; doubles after each failure
        initial_backoff: Duration,
    },
    /// Publish `CartEvent::PersistFailed` for the integrator to handle
    Propagate,
}

impl PersistPolicy {
    fn max_attempts(&self) -> u32 {
        match self {
            PersistPolicy::Retry { max_attempts, .. } => (*max_attempts).max(1),
            _ => 1,
        }
    }

    fn initial_backoff(&self) -> Duration {
        match self {
            PersistPolicy::Retry { initial_backoff, .. } => *initial_backoff,
            _ => Duration::ZERO,
        }
    }
}

/// What a single persist request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// The snapshot was stored
    Written {
        /// Store calls it took
        attempts: u32,
    },
    /// A newer revision was already stored
    Skipped,
    /// Every attempt failed
    Failed,
}

// =============================================================================
// Snapshot Writer
// =============================================================================

/// Writes full cart snapshots to a single key.
pub struct SnapshotWriter {
    store: Arc<dyn KeyValueStore>,
    key: String,
    policy: PersistPolicy,
    event_bus: Arc<EventBus>,
    last_written: Mutex<u64>,
}

impl SnapshotWriter {
    /// Create a writer for `key`.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        key: impl Into<String>,
        policy: PersistPolicy,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            store,
            key: key.into(),
            policy,
            event_bus,
            last_written: Mutex::new(0),
        }
    }

    /// The key snapshots are written to.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Highest revision stored so far (0 before the first write).
    pub async fn last_written(&self) -> u64 {
        *self.last_written.lock().await
    }

    /// Persist `state` as revision `revision`.
    ///
    /// Store failures are handled by the policy and reported as
    /// [`PersistOutcome::Failed`]; only encoding errors are returned as `Err`.
    pub async fn persist(&self, revision: u64, state: &CartState) -> CartResult<PersistOutcome> {
        let payload = snapshot::encode(state)?;

        let mut last_written = self.last_written.lock().await;
        if revision <= *last_written {
            debug!(
                revision,
                last_written = *last_written,
                "Skipping stale snapshot write"
            );
            return Ok(PersistOutcome::Skipped);
        }

        let max_attempts = self.policy.max_attempts();
        let mut backoff = self.policy.initial_backoff();
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.store.set(&self.key, &payload).await {
                Ok(()) => {
                    *last_written = revision;
                    debug!(revision, attempt, items = state.len(), "Cart snapshot persisted");
                    self.event_bus.send(CartEvent::Persisted {
                        revision,
                        attempts: attempt,
                    });
                    return Ok(PersistOutcome::Written { attempts: attempt });
                }
                Err(e) if attempt < max_attempts => {
                    warn!(
                        revision,
                        attempt,
                        max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Snapshot write failed (will retry)"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
                Err(e) => {
                    self.report_failure(revision, attempt, &e.to_string());
                    return Ok(PersistOutcome::Failed);
                }
            }
        }
    }

    fn report_failure(&self, revision: u64, attempts: u32, message: &str) {
        match self.policy {
            PersistPolicy::Propagate => {
                warn!(revision, error = %message, "Snapshot write failed, propagating");
                self.event_bus.send(CartEvent::PersistFailed {
                    revision,
                    error: message.to_string(),
                });
            }
            PersistPolicy::LogAndContinue | PersistPolicy::Retry { .. } => {
                error!(revision, attempts, error = %message, "Snapshot write failed, giving up");
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
