//! Cart Domain Layer
//!
//! Pure cart logic with zero I/O dependencies.
//! Contains the line item entities, value objects, and the cart state machine.
//!
//! Every transition takes the current [`CartState`] by reference and returns a
//! new one, so a published state is never mutated after the fact.
//!
//! ```
//! use cart_domain::{CartState, Mutation, Product};
//! use rust_decimal_macros::dec;
//!
//! let product = Product::new("a", "T", "u", dec!(10)).unwrap();
//!
//! let added = CartState::empty().add(product.clone());
//! assert_eq!(added.mutation, Mutation::Added);
//!
//! let again = added.state.add(product);
//! assert_eq!(again.state.get("a").unwrap().quantity.get(), 2);
//! assert_eq!(again.state.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod cart;
pub mod entities;
pub mod value_objects;

// Re-export commonly used types
pub use cart::{CartState, Mutation, Normalized, Transition};
pub use entities::{LineItem, Product};
pub use value_objects::{DomainError, ProductId, Quantity};
