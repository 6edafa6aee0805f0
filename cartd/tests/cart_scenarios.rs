//! E2E scenarios: cart mutations through the manager, checked against
//! the cart and the persisted snapshot.
//!
//! Each scenario starts from a seeded store, hydrates, applies one
//! mutation, and verifies both the in-memory cart and what was written.

use std::sync::Arc;

use cart_domain::{CartState, Mutation, Product, Quantity};
use cart_store::MemoryStore;
use cart_testkit::{cart_of, product, seeded_store};
use cartd::{snapshot, CartManager, Config};
use rust_decimal_macros::dec;

// =============================================================================
// Helpers
// =============================================================================

fn key() -> String {
    Config::test().store.key
}

async fn manager_over(cart: &CartState) -> (CartManager, Arc<MemoryStore>) {
    let store = Arc::new(seeded_store(&key(), cart));
    let manager = CartManager::start(store.clone(), &Config::test());
    manager.hydrated().await;
    (manager, store)
}

fn stored(store: &MemoryStore) -> CartState {
    let raw = store.peek(&key()).expect("snapshot stored");
    snapshot::decode(&raw).expect("snapshot decodes").state
}

fn quantities(cart: &CartState) -> Vec<(String, u32)> {
    cart.iter().map(|item| (item.id.to_string(), item.quantity.get())).collect()
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_add_to_empty_cart() {
    let store = Arc::new(MemoryStore::new());
    let manager = CartManager::start(store.clone(), &Config::test());
    manager.hydrated().await;

    let mutation = manager.add_to_cart(Product::new("a", "T", "u", dec!(10)).unwrap());
    manager.flush().await;

    assert_eq!(mutation, Mutation::Added);
    let cart = manager.products();
    let item = cart.get("a").unwrap();
    assert_eq!(cart.len(), 1);
    assert_eq!(item.quantity, Quantity::ONE);
    assert_eq!(item.price, dec!(10));
    assert_eq!(item.title, "T");
    assert_eq!(item.image_url, "u");
    assert_eq!(stored(&store), *cart);
}

#[tokio::test]
async fn test_add_existing_product_increments() {
    let (manager, store) = manager_over(&cart_of(&[("a", 1)])).await;

    manager.add_to_cart(product("a"));
    manager.flush().await;

    assert_eq!(quantities(&manager.products()), vec![("a".to_string(), 2)]);
    assert_eq!(quantities(&stored(&store)), vec![("a".to_string(), 2)]);
}

#[tokio::test]
async fn test_decrement_above_one() {
    let (manager, store) = manager_over(&cart_of(&[("a", 2)])).await;

    let mutation = manager.decrement("a");
    manager.flush().await;

    assert_eq!(mutation, Mutation::Decremented { quantity: Quantity::ONE });
    assert_eq!(quantities(&manager.products()), vec![("a".to_string(), 1)]);
    assert_eq!(quantities(&stored(&store)), vec![("a".to_string(), 1)]);
}

#[tokio::test]
async fn test_decrement_at_one_removes() {
    let (manager, store) = manager_over(&cart_of(&[("a", 1)])).await;

    let mutation = manager.decrement("a");
    manager.flush().await;

    assert_eq!(mutation, Mutation::Removed);
    assert!(manager.products().is_empty());
    assert!(stored(&store).is_empty());
}

#[tokio::test]
async fn test_increment_absent_leaves_cart_and_store_alone() {
    let seeded = cart_of(&[("a", 1)]);
    let (manager, store) = manager_over(&seeded).await;

    let mutation = manager.increment("b");
    manager.flush().await;

    assert_eq!(mutation, Mutation::Unchanged);
    assert_eq!(*manager.products(), seeded);
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_restart_hydrates_snapshot_exactly() {
    let seeded = cart_of(&[("x", 3)]);
    let (manager, _store) = manager_over(&seeded).await;

    assert!(manager.is_hydrated());
    assert_eq!(*manager.products(), seeded);
}

// =============================================================================
// Sequences
// =============================================================================

#[tokio::test]
async fn test_mixed_sequence_keeps_invariants() {
    let (manager, store) = manager_over(&CartState::empty()).await;

    manager.add_to_cart(product("a"));
    manager.add_to_cart(product("b"));
    manager.add_to_cart(product("a"));
    manager.increment("b");
    manager.decrement("a");
    manager.decrement("zzz");
    manager.decrement("b");
    manager.decrement("b");
    manager.flush().await;

    let cart = manager.products();
    assert_eq!(quantities(&cart), vec![("a".to_string(), 1)]);
    assert!(cart.iter().all(|item| item.quantity.get() >= 1));
    assert_eq!(stored(&store), *cart);
}

#[tokio::test]
async fn test_every_change_is_published() {
    let (manager, _store) = manager_over(&CartState::empty()).await;
    let mut events = manager.subscribe();

    manager.add_to_cart(product("a"));
    manager.increment("missing");
    manager.increment("a");

    let mut revisions = Vec::new();
    while let Some(Ok(event)) = events.try_recv() {
        if let cartd::CartEvent::Changed { revision, state, .. } = event {
            revisions.push((revision, state.total_quantity()));
        }
    }

    assert_eq!(revisions, vec![(1, 1), (2, 2)]);
}
