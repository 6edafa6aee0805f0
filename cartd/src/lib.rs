//! Cart Runtime Library
//!
//! Owns the in-memory shopping cart and keeps it persisted to a local
//! key-value store.
//!
//! # Architecture
//!
//! ```text
//! UI / CLI → CartManager → cart-domain transitions
//!                 │
//!                 ├──► SnapshotWriter (spawned per change) → KeyValueStore
//!                 │
//!                 └──► EventBus (observers)
//! ```
//!
//! # Components
//!
//! - **Cart Manager**: cart ownership, mutations, hydration
//! - **Persistence**: background snapshot writes with an injectable failure policy
//! - **Provider**: task-local scope for ambient cart lookup
//! - **Event Bus**: change, hydration, and persistence notifications
//! - **Config**: environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cart_store::FileStore;
//! use cartd::{CartManager, Config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("Failed to load config");
//!     let store = Arc::new(FileStore::new(&config.store.path));
//!
//!     let cart = CartManager::start(store, &config);
//!     cart.hydrated().await;
//!     cart.increment("sku-1");
//!     cart.flush().await;
//! }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod event_bus;
pub mod manager;
pub mod persistence;
pub mod provider;
pub mod snapshot;

// Re-exports for convenience
pub use config::{Config, Environment, StoreConfig, DEFAULT_STORE_KEY};
pub use error::{CartError, CartResult};
pub use event_bus::{CartEvent, EventBus, EventReceiver};
pub use manager::{CartManager, HydrationPolicy, HydrationReport};
pub use persistence::{PersistOutcome, PersistPolicy, SnapshotWriter};
pub use provider::{use_cart, CartProvider};
