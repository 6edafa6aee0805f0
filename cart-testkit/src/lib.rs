//! Test helpers for cart tests.
//!
//! Provides sample products, seeded stores, and store wrappers that inject
//! failures or latency.

mod helpers;
mod stores;

pub use helpers::{cart_of, product, seeded_store, snapshot_json};
pub use stores::{FlakyStore, SlowStore};
