//! Provider scope for code that cannot take the cart as a parameter.
//!
//! The normal way to reach the cart is to pass a [`CartManager`] down to
//! whoever needs it. For deep call stacks a manager can instead be installed
//! for the duration of a future with [`CartProvider::scope`] and looked up
//! with [`use_cart`].
//!
//! The scope is task-local: it covers the scoped future and everything it
//! awaits, but not tasks it spawns. Looking the cart up anywhere else is a
//! wiring mistake and yields [`CartError::NoProvider`].

use std::future::Future;

use crate::error::{CartError, CartResult};
use crate::manager::CartManager;

tokio::task_local! {
    static CURRENT_CART: CartManager;
}

/// Installs a cart manager for a scope.
pub struct CartProvider;

impl CartProvider {
    /// Run `future` with `manager` available through [`use_cart`].
    pub async fn scope<F: Future>(manager: CartManager, future: F) -> F::Output {
        CURRENT_CART.scope(manager, future).await
    }

    /// Run `f` with `manager` available through [`use_cart`].
    pub fn sync_scope<R>(manager: CartManager, f: impl FnOnce() -> R) -> R {
        CURRENT_CART.sync_scope(manager, f)
    }
}

/// The cart manager installed by the enclosing [`CartProvider`] scope.
///
/// # Errors
/// Returns `CartError::NoProvider` outside a provider scope.
pub fn use_cart() -> CartResult<CartManager> {
    CURRENT_CART.try_with(CartManager::clone).map_err(|_| CartError::NoProvider)
}
