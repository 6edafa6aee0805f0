//! Cart Manager: owns the authoritative cart and keeps the store in sync.
//!
//! The Cart Manager is responsible for:
//! - Applying add / increment / decrement to the current cart
//! - Publishing each new cart as an immutable `Arc<CartState>`
//! - Spawning a snapshot write for every change
//! - Hydrating once from the store at startup
//!
//! # Architecture
//!
//! ```text
//! UI → CartManager ──(revision, Arc<CartState>)──► task → SnapshotWriter → Store
//!           │
//!           └──► EventBus (Changed, Hydrated, Persisted, PersistFailed)
//! ```
//!
//! # Hydration and early mutations
//!
//! Mutations are accepted before hydration completes and take effect on the
//! in-memory cart right away. Their snapshot writes are held back until
//! hydration has read the store, so they cannot clobber the snapshot being
//! loaded. When hydration lands, [`HydrationPolicy`] decides what happens to
//! those early mutations.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use cart_domain::{CartState, Mutation, Product, Transition};
use cart_store::KeyValueStore;
use tokio::runtime::Handle;
use tokio::sync::{watch, Mutex};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{CartError, CartResult};
use crate::event_bus::{CartEvent, EventBus, EventReceiver};
use crate::persistence::SnapshotWriter;
use crate::snapshot;

// =============================================================================
// Policies and reports
// =============================================================================

/// What hydration does with mutations issued before it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HydrationPolicy {
    /// Replay early mutations on top of the stored snapshot
    #[default]
    Replay,
    /// Replace the cart wholesale with the stored snapshot, discarding
    /// early mutations
    Overwrite,
}

/// Outcome of startup hydration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HydrationReport {
    /// Whether a snapshot existed under the cart key
    pub found: bool,
    /// Items in the cart once hydration finished
    pub items: usize,
    /// Snapshot records dropped or merged during normalization
    pub repaired: usize,
    /// Early mutations replayed on top of the snapshot
    pub replayed: usize,
    /// Early mutations discarded by an overwriting hydration
    pub discarded: usize,
}

/// A recorded mutation request, kept for replay until hydration completes.
#[derive(Debug, Clone)]
enum Command {
    Add(Product),
    Increment(String),
    Decrement(String),
}

impl Command {
    fn apply(&self, state: &CartState) -> Transition {
        match self {
            Command::Add(product) => state.add(product.clone()),
            Command::Increment(id) => state.increment(id),
            Command::Decrement(id) => state.decrement(id),
        }
    }

    fn product_id(&self) -> &str {
        match self {
            Command::Add(product) => product.id.as_str(),
            Command::Increment(id) | Command::Decrement(id) => id,
        }
    }
}

/// The cart slot guarded by the manager's lock.
struct Slot {
    current: Arc<CartState>,
    revision: u64,
    hydrated: bool,
    early: Vec<Command>,
}

struct Inner {
    store: Arc<dyn KeyValueStore>,
    key: String,
    hydration_policy: HydrationPolicy,
    slot: RwLock<Slot>,
    writer: Arc<SnapshotWriter>,
    event_bus: Arc<EventBus>,
    hydration_started: AtomicBool,
    hydrated_tx: watch::Sender<bool>,
    tasks: TaskTracker,
    runtime: Handle,
    flush_lock: Mutex<()>,
}

// =============================================================================
// Cart Manager
// =============================================================================

/// Owns the cart and synchronizes it with the store.
///
/// Cloning is cheap; all clones share the same cart. Mutations take effect
/// synchronously and spawn their snapshot writes on the runtime the manager
/// was created in, so they can be called from any thread.
#[derive(Clone)]
pub struct CartManager {
    inner: Arc<Inner>,
}

impl CartManager {
    /// Create a manager holding an empty, not yet hydrated cart.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime.
    pub fn new<S: KeyValueStore + 'static>(store: Arc<S>, config: &Config) -> Self {
        let store: Arc<dyn KeyValueStore> = store;
        let event_bus = Arc::new(EventBus::new(config.event_capacity));
        let writer = Arc::new(SnapshotWriter::new(
            store.clone(),
            config.store.key.clone(),
            config.persist,
            event_bus.clone(),
        ));
        let (hydrated_tx, _) = watch::channel(false);

        Self {
            inner: Arc::new(Inner {
                store,
                key: config.store.key.clone(),
                hydration_policy: config.hydration,
                slot: RwLock::new(Slot {
                    current: Arc::new(CartState::empty()),
                    revision: 0,
                    hydrated: false,
                    early: Vec::new(),
                }),
                writer,
                event_bus,
                hydration_started: AtomicBool::new(false),
                hydrated_tx,
                tasks: TaskTracker::new(),
                runtime: Handle::current(),
                flush_lock: Mutex::new(()),
            }),
        }
    }

    /// Create a manager and start hydrating it in the background.
    ///
    /// The returned manager is usable immediately; await
    /// [`CartManager::hydrated`] to observe the stored cart.
    pub fn start<S: KeyValueStore + 'static>(store: Arc<S>, config: &Config) -> Self {
        let manager = Self::new(store, config);
        let hydrating = manager.clone();
        manager.spawn_tracked(async move {
            // Failures are logged and published inside hydrate()
            let _ = hydrating.hydrate().await;
        });
        manager
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// The current cart.
    pub fn products(&self) -> Arc<CartState> {
        self.read_slot(|slot| slot.current.clone())
    }

    /// Revision of the current cart; bumps on every change.
    pub fn revision(&self) -> u64 {
        self.read_slot(|slot| slot.revision)
    }

    /// Whether startup hydration has completed.
    pub fn is_hydrated(&self) -> bool {
        self.read_slot(|slot| slot.hydrated)
    }

    /// Subscribe to cart events.
    pub fn subscribe(&self) -> EventReceiver {
        self.inner.event_bus.subscribe()
    }

    /// Key the cart snapshot is stored under.
    pub fn store_key(&self) -> &str {
        &self.inner.key
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Add one unit of `product`; an existing product is incremented instead.
    pub fn add_to_cart(&self, product: Product) -> Mutation {
        self.apply(Command::Add(product))
    }

    /// Add one unit of an existing item. Absent ids are a no-op.
    pub fn increment(&self, id: &str) -> Mutation {
        self.apply(Command::Increment(id.to_string()))
    }

    /// Remove one unit of an existing item, removing it at quantity 1.
    /// Absent ids are a no-op.
    pub fn decrement(&self, id: &str) -> Mutation {
        self.apply(Command::Decrement(id.to_string()))
    }

    fn apply(&self, command: Command) -> Mutation {
        let (mutation, revision, state, hydrated) = {
            let mut slot = self.inner.slot.write().unwrap_or_else(PoisonError::into_inner);
            let transition = command.apply(&slot.current);

            if !slot.hydrated {
                slot.early.push(command.clone());
            }

            if !transition.mutation.changed() {
                debug!(product_id = %command.product_id(), "Cart mutation targeted an absent item");
                return Mutation::Unchanged;
            }

            slot.revision += 1;
            slot.current = Arc::new(transition.state);
            (transition.mutation, slot.revision, slot.current.clone(), slot.hydrated)
        };

        debug!(
            product_id = %command.product_id(),
            mutation = mutation.name(),
            revision,
            items = state.len(),
            "Cart changed"
        );

        self.inner.event_bus.send(CartEvent::Changed {
            revision,
            product_id: command.product_id().to_string(),
            mutation,
            state: state.clone(),
            timestamp: chrono::Utc::now(),
        });

        if hydrated {
            self.schedule_persist(revision, state);
        } else {
            debug!(revision, "Hydration pending, holding back snapshot write");
        }

        mutation
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    /// Read the stored snapshot into the cart. Runs at most once per manager;
    /// later calls return an empty report without touching the store.
    ///
    /// A malformed snapshot is logged and hydrates an empty cart. A store
    /// read failure also leaves the cart as it is, but is returned as `Err`
    /// after the manager has been marked hydrated.
    pub async fn hydrate(&self) -> CartResult<HydrationReport> {
        if self.inner.hydration_started.swap(true, Ordering::SeqCst) {
            debug!("Hydration already started, skipping");
            return Ok(HydrationReport::default());
        }

        info!(key = %self.inner.key, "Hydrating cart");

        let (raw, read_error) = match self.inner.store.get(&self.inner.key).await {
            Ok(raw) => (raw, None),
            Err(e) => {
                error!(key = %self.inner.key, error = %e, "Failed to read cart snapshot");
                self.inner.event_bus.send(CartEvent::HydrationFailed {
                    error: e.to_string(),
                });
                (None, Some(e))
            }
        };

        let found = raw.is_some();
        let normalized = match raw.as_deref().map(snapshot::decode).transpose() {
            Ok(normalized) => normalized.unwrap_or_default(),
            Err(e) => {
                error!(key = %self.inner.key, error = %e, "Malformed cart snapshot");
                Default::default()
            }
        };

        for id in &normalized.dropped {
            warn!(product_id = %id, "Dropped snapshot record with zero quantity");
        }
        for id in &normalized.merged {
            warn!(product_id = %id, "Merged duplicate snapshot records");
        }
        let repaired = normalized.dropped.len() + normalized.merged.len() + normalized.rejected;

        let (report, state, persist) = self.settle(normalized.state, read_error.is_none());
        let report = HydrationReport { found, repaired, ..report };

        info!(
            found,
            items = report.items,
            repaired,
            replayed = report.replayed,
            discarded = report.discarded,
            "Cart hydrated"
        );

        self.inner.event_bus.send(CartEvent::Hydrated {
            state,
            items: report.items,
            replayed: report.replayed,
            discarded: report.discarded,
        });
        self.inner.hydrated_tx.send_replace(true);

        if let Some((revision, state)) = persist {
            self.schedule_persist(revision, state);
        }

        match read_error {
            Some(e) => Err(CartError::Store(e)),
            None => Ok(report),
        }
    }

    /// Install the hydrated cart and resolve early mutations.
    ///
    /// Returns the report, the hydrated cart and, when the cart now differs
    /// from the store, the revision and state that need writing.
    fn settle(
        &self,
        snapshot: CartState,
        store_readable: bool,
    ) -> (HydrationReport, Arc<CartState>, Option<(u64, Arc<CartState>)>) {
        let mut slot = self.inner.slot.write().unwrap_or_else(PoisonError::into_inner);
        let early = std::mem::take(&mut slot.early);
        slot.hydrated = true;

        if !store_readable {
            // Nothing was loaded; keep whatever the caller built so far and
            // release the writes held back for it. Revisions only move on
            // changes, so a nonzero one means an early mutation changed the cart.
            let report = HydrationReport {
                items: slot.current.len(),
                ..HydrationReport::default()
            };
            let persist = (slot.revision > 0).then(|| (slot.revision, slot.current.clone()));
            return (report, slot.current.clone(), persist);
        }

        match self.inner.hydration_policy {
            HydrationPolicy::Replay => {
                let replayed = early.len();
                let state = early
                    .iter()
                    .fold(snapshot, |state, command| command.apply(&state).state);
                slot.current = Arc::new(state);

                let persist = (replayed > 0).then(|| {
                    slot.revision += 1;
                    (slot.revision, slot.current.clone())
                });
                let report = HydrationReport {
                    items: slot.current.len(),
                    replayed,
                    ..HydrationReport::default()
                };
                (report, slot.current.clone(), persist)
            }
            HydrationPolicy::Overwrite => {
                let discarded = early.len();
                if discarded > 0 {
                    warn!(discarded, "Hydration overwrote mutations made before it completed");
                    slot.revision += 1;
                }
                slot.current = Arc::new(snapshot);

                let report = HydrationReport {
                    items: slot.current.len(),
                    discarded,
                    ..HydrationReport::default()
                };
                (report, slot.current.clone(), None)
            }
        }
    }

    /// Wait until startup hydration has completed.
    pub async fn hydrated(&self) {
        let mut rx = self.inner.hydrated_tx.subscribe();
        // The sender lives in `inner`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|hydrated| *hydrated).await;
    }

    /// Wait for every spawned hydration and snapshot write to finish.
    ///
    /// Concurrent callers take turns, so each one's wait ends before the
    /// tracker is reopened for the next.
    pub async fn flush(&self) {
        let _turn = self.inner.flush_lock.lock().await;
        let tasks = &self.inner.tasks;
        tasks.close();
        tasks.wait().await;
        tasks.reopen();
    }

    fn schedule_persist(&self, revision: u64, state: Arc<CartState>) {
        let writer = self.inner.writer.clone();
        self.spawn_tracked(async move {
            if let Err(e) = writer.persist(revision, &state).await {
                error!(revision, error = %e, "Could not encode cart snapshot");
            }
        });
    }

    fn spawn_tracked<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.tasks.spawn_on(task, &self.inner.runtime);
    }

    fn read_slot<T>(&self, f: impl FnOnce(&Slot) -> T) -> T {
        let slot = self.inner.slot.read().unwrap_or_else(PoisonError::into_inner);
        f(&slot)
    }
}

impl std::fmt::Debug for CartManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartManager")
            .field("key", &self.inner.key)
            .field("revision", &self.revision())
            .field("hydrated", &self.is_hydrated())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
