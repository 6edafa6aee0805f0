//! Cart state machine.
//!
//! `CartState` is an ordered, id-unique sequence of line items. The three
//! transitions (`add`, `increment`, `decrement`) never modify `self`; each
//! builds a fresh item vector so that earlier states stay valid for anyone
//! still holding them.
//!
//! # Rules
//!
//! ```text
//! add(P)        P present  → increment(P.id)
//!               P absent   → append P with quantity 1
//! increment(id) present    → quantity + 1
//!               absent     → unchanged
//! decrement(id) q > 1      → quantity - 1
//!               q <= 1     → item removed
//!               absent     → unchanged
//! ```

use serde::{Deserialize, Serialize};

use crate::entities::{LineItem, Product};
use crate::value_objects::{ProductId, Quantity};

// =============================================================================
// Mutation outcome
// =============================================================================

/// What a single transition did to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// A new line item was appended with quantity 1
    Added,
    /// An existing item gained one unit
    Incremented {
        /// Quantity after the increment
        quantity: Quantity,
    },
    /// An existing item lost one unit and is still in the cart
    Decremented {
        /// Quantity after the decrement
        quantity: Quantity,
    },
    /// An item at quantity 1 was removed
    Removed,
    /// The id was not in the cart; nothing changed
    Unchanged,
}

impl Mutation {
    /// Whether the transition produced a different cart.
    pub fn changed(&self) -> bool {
        !matches!(self, Mutation::Unchanged)
    }

    /// Short name for logs and events.
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::Added => "added",
            Mutation::Incremented { .. } => "incremented",
            Mutation::Decremented { .. } => "decremented",
            Mutation::Removed => "removed",
            Mutation::Unchanged => "unchanged",
        }
    }
}

/// Result of applying a transition: the next state and what happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The cart after the transition
    pub state: CartState,
    /// What the transition did
    pub mutation: Mutation,
}

/// A snapshot turned into a valid cart, with what had to be fixed on the way.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Normalized {
    /// The valid cart
    pub state: CartState,
    /// Records dropped because they had a zero quantity
    pub dropped: Vec<ProductId>,
    /// Ids that appeared more than once and were merged into one item
    pub merged: Vec<ProductId>,
    /// Records that could not be read at all (bad id, price or shape)
    pub rejected: usize,
}

impl Normalized {
    /// Whether the snapshot was already a valid cart.
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty() && self.merged.is_empty() && self.rejected == 0
    }
}

// =============================================================================
// CartState
// =============================================================================

/// The full collection of line items at a point in time.
///
/// # Invariants
/// - At most one line item per product id
/// - Every line item has `quantity >= 1`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartState {
    items: Vec<LineItem>,
}

impl CartState {
    /// An empty cart.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a valid cart from raw snapshot records.
    ///
    /// Zero-quantity records are dropped; repeated ids are merged
    /// into their first occurrence by summing quantities.
    pub fn normalize(records: Vec<LineItem>) -> Normalized {
        let mut items: Vec<LineItem> = Vec::with_capacity(records.len());
        let mut dropped = Vec::new();
        let mut merged = Vec::new();

        for record in records {
            if record.quantity.is_zero() {
                dropped.push(record.id);
                continue;
            }

            match items.iter_mut().find(|item| item.id == record.id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(record.quantity);
                    if !merged.contains(&record.id) {
                        merged.push(record.id);
                    }
                }
                None => items.push(record),
            }
        }

        Normalized {
            state: Self { items },
            dropped,
            merged,
            rejected: 0,
        }
    }

    /// Add one unit of `product`, appending it if it is not in the cart yet.
    pub fn add(&self, product: Product) -> Transition {
        if self.contains(product.id.as_str()) {
            return self.increment(product.id.as_str());
        }

        let mut items = self.items.clone();
        items.push(LineItem::from_product(product));

        Transition {
            state: Self { items },
            mutation: Mutation::Added,
        }
    }

    /// Add one unit to an existing item. Absent ids leave the cart unchanged.
    pub fn increment(&self, id: &str) -> Transition {
        let Some(index) = self.position(id) else {
            return self.unchanged();
        };

        let quantity = self.items[index].quantity.incremented();
        Transition {
            state: self.with_quantity_at(index, quantity),
            mutation: Mutation::Incremented { quantity },
        }
    }

    /// Remove one unit from an existing item, dropping it at quantity 1.
    /// Absent ids leave the cart unchanged.
    pub fn decrement(&self, id: &str) -> Transition {
        let Some(index) = self.position(id) else {
            return self.unchanged();
        };

        match self.items[index].quantity.decremented() {
            Some(quantity) => Transition {
                state: self.with_quantity_at(index, quantity),
                mutation: Mutation::Decremented { quantity },
            },
            None => {
                let items = self
                    .items
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != index)
                    .map(|(_, item)| item.clone())
                    .collect();

                Transition {
                    state: Self { items },
                    mutation: Mutation::Removed,
                }
            }
        }
    }

    /// Look up a line item by product id.
    pub fn get(&self, id: &str) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Whether the cart holds the product.
    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Line items in cart order.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Iterate line items in cart order.
    pub fn iter(&self) -> std::slice::Iter<'_, LineItem> {
        self.items.iter()
    }

    /// Product ids in cart order.
    pub fn ids(&self) -> Vec<&ProductId> {
        self.items.iter().map(|item| &item.id).collect()
    }

    /// Number of distinct products.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all quantities.
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity.get())).sum()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    fn with_quantity_at(&self, index: usize, quantity: Quantity) -> Self {
        let mut items = self.items.clone();
        items[index] = items[index].with_quantity(quantity);
        Self { items }
    }

    fn unchanged(&self) -> Transition {
        Transition {
            state: self.clone(),
            mutation: Mutation::Unchanged,
        }
    }
}

impl<'a> IntoIterator for &'a CartState {
    type Item = &'a LineItem;
    type IntoIter = std::slice::Iter<'a, LineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// =============================================================================
// Tests
// =============================================================================
