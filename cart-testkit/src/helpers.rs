//! Seeding helpers.

use cart_domain::{CartState, LineItem, Product, Quantity};
use cart_store::MemoryStore;
use rust_decimal::Decimal;

/// A product with predictable metadata: title `"Product {id}"`, image
/// `"https://img.example/{id}.png"`, price 10.
///
/// Panics on a blank id; test-only.
pub fn product(id: &str) -> Product {
    Product::new(
        id,
        format!("Product {id}"),
        format!("https://img.example/{id}.png"),
        Decimal::from(10),
    )
    .expect("test product id must be non-empty")
}

/// Build a cart from `(id, quantity)` pairs using [`product`] metadata.
pub fn cart_of(entries: &[(&str, u32)]) -> CartState {
    let records = entries
        .iter()
        .map(|(id, quantity)| {
            LineItem::from_product(product(id))
                .with_quantity(Quantity::new(*quantity).expect("test quantity must be >= 1"))
        })
        .collect();
    CartState::normalize(records).state
}

/// Serialize a cart the way the runtime persists it.
pub fn snapshot_json(cart: &CartState) -> String {
    serde_json::to_string(cart).expect("cart snapshot serializes")
}

/// A memory store already holding `cart` under `key`.
pub fn seeded_store(key: &str, cart: &CartState) -> MemoryStore {
    MemoryStore::with_entry(key, snapshot_json(cart))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cart_store::KeyValueStore;

    #[test]
    fn test_cart_of_keeps_order() {
        let cart = cart_of(&[("b", 2), ("a", 1)]);
        assert_eq!(cart.ids(), vec!["b", "a"]);
        assert_eq!(cart.total_quantity(), 3);
    }

    #[tokio::test]
    async fn test_seeded_store_round_trip() {
        let cart = cart_of(&[("x", 3)]);
        let store = seeded_store("key", &cart);

        let raw = store.get("key").await.unwrap().unwrap();
        let restored: CartState = serde_json::from_str(&raw).unwrap();
        assert_eq!(restored, cart);
    }
}
