//! Cart Storage Layer
//!
//! Durable local key-value persistence for cart snapshots.
//!
//! # Architecture
//!
//! - **`KeyValueStore` trait**: the storage interface (port)
//! - **In-memory store**: fast implementation for testing
//! - **File store**: JSON file on disk, one entry per key
//!
//! # Usage
//!
//! ```rust
//! use cart_store::{KeyValueStore, MemoryStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryStore::new();
//!
//!     store.set("@GoMarketplace:cart", "[]").await.unwrap();
//!
//!     let value = store.get("@GoMarketplace:cart").await.unwrap();
//!     assert_eq!(value.as_deref(), Some("[]"));
//! }
//! ```

#![warn(clippy::all)]

// Modules
mod error;
mod file;
mod memory;
mod repository;

// Re-exports
pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use repository::KeyValueStore;
