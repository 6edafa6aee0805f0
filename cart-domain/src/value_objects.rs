//! Value Objects for the Cart Domain
//!
//! Small validated primitives shared by the entities and the state machine.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Domain errors for value object validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Product id must be non-empty
    #[error("Invalid product id: {0}")]
    InvalidProductId(String),

    /// Quantity must be at least one
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),
}

// =============================================================================
// ProductId
// =============================================================================

/// Stable product identifier, unique within a cart.
///
/// # Invariants
/// - Never blank; deserialization goes through [`ProductId::new`] too
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductId(String);

impl ProductId {
    /// Create a new ProductId with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidProductId` if the id is empty or blank
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidProductId("Product id must be non-empty".to_string()));
        }
        Ok(Self(id))
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

}

impl TryFrom<String> for ProductId {
    type Error = DomainError;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<ProductId> for String {
    fn from(id: ProductId) -> Self {
        id.0
    }
}

impl Borrow<str> for ProductId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ProductId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ProductId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Quantity
// =============================================================================

/// Number of units of a product in the cart
///
/// # Invariants
/// - Must be >= 1 for any line item held in a [`crate::CartState`]
/// - A zero quantity only exists transiently, for snapshot records written
///   with a missing, `null` or `0` quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    /// A single unit, the quantity of a freshly added product
    pub const ONE: Quantity = Quantity(1);

    /// Create a new Quantity with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidQuantity` if value is 0
    pub fn new(value: u32) -> Result<Self, DomainError> {
        if value == 0 {
            return Err(DomainError::InvalidQuantity("Quantity must be at least 1".to_string()));
        }
        Ok(Self(value))
    }

    /// Create a zero quantity (for deserialization defaults only)
    pub fn zero() -> Self {
        Self(0)
    }

    /// Get the underlying value
    pub fn get(&self) -> u32 {
        self.0
    }

    /// Whether this quantity is zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// One more unit. A zero quantity counts as 0, so the result is always >= 1.
    pub fn incremented(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// One fewer unit, or `None` when the item should leave the cart.
    pub fn decremented(self) -> Option<Self> {
        if self.0 > 1 {
            Some(Self(self.0 - 1))
        } else {
            None
        }
    }

    /// Sum of two quantities, saturating at `u32::MAX`
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_id_rejects_blank() {
        assert!(ProductId::new("").is_err());
        assert!(ProductId::new("   ").is_err());
        assert_eq!(ProductId::new("sku-1").unwrap().as_str(), "sku-1");
    }

    #[test]
    fn test_product_id_compares_with_str() {
        let id = ProductId::new("abc").unwrap();
        assert!(id == "abc");
        assert_eq!(id.to_string(), "abc");
    }

    #[test]
    fn test_product_id_deserialization_validates() {
        let id: ProductId = serde_json::from_str(r#""sku-1""#).unwrap();
        assert_eq!(id, "sku-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""sku-1""#);

        assert!(serde_json::from_str::<ProductId>(r#""""#).is_err());
        assert!(serde_json::from_str::<ProductId>(r#""  ""#).is_err());
    }

    #[test]
    fn test_quantity_validation() {
        assert!(Quantity::new(0).is_err());
        assert_eq!(Quantity::new(3).unwrap().get(), 3);
    }

    #[test]
    fn test_quantity_increment_from_zero() {
        assert_eq!(Quantity::zero().incremented(), Quantity::ONE);
        assert_eq!(Quantity::ONE.incremented().get(), 2);
        assert_eq!(Quantity(u32::MAX).incremented().get(), u32::MAX);
    }

    #[test]
    fn test_quantity_decrement() {
        assert_eq!(Quantity::new(2).unwrap().decremented(), Some(Quantity::ONE));
        assert_eq!(Quantity::ONE.decremented(), None);
        assert_eq!(Quantity::zero().decremented(), None);
    }

    #[test]
    fn test_quantity_serializes_as_integer() {
        let json = serde_json::to_string(&Quantity::new(4).unwrap()).unwrap();
        assert_eq!(json, "4");
    }
}
