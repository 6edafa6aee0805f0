//! Cart runtime error types.

use cart_domain::DomainError;
use cart_store::StoreError;
use thiserror::Error;

/// Cart runtime errors.
///
/// The cart operations themselves never fail; these come from wiring,
/// configuration, and the store behind the cart.
#[derive(Debug, Error)]
pub enum CartError {
    /// `use_cart` was called outside a `CartProvider` scope
    #[error("use_cart must be used within a CartProvider")]
    NoProvider,

    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Snapshot could not be encoded or decoded
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for cart runtime operations.
pub type CartResult<T> = Result<T, CartError>;
