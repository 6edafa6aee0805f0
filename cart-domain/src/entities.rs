//! Cart entities: the product offered to the cart and the line item it becomes.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::value_objects::{DomainError, ProductId, Quantity};

// =============================================================================
// Product
// =============================================================================

/// A catalog product as handed to the cart by the UI.
///
/// Display metadata and price are opaque to the cart: they are stored and
/// persisted unchanged, never computed or validated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Stable product identifier
    pub id: ProductId,
    /// Display title
    pub title: String,
    /// Display image
    pub image_url: String,
    /// Unit price
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub price: Decimal,
}

impl Product {
    /// Create a product, validating only its id.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidProductId` if `id` is blank
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        image_url: impl Into<String>,
        price: Decimal,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            id: ProductId::new(id)?,
            title: title.into(),
            image_url: image_url.into(),
            price,
        })
    }
}

// =============================================================================
// LineItem
// =============================================================================

/// One product entry in the cart.
///
/// This is also the snapshot record format: `id`, `title`, `image_url`,
/// `price` (JSON number, written with every digit) and `quantity` (integer).
/// A record stored with a missing or `null` quantity reads back as zero and
/// is dropped during hydration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Stable product identifier
    pub id: ProductId,
    /// Display title
    pub title: String,
    /// Display image
    pub image_url: String,
    /// Unit price
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub price: Decimal,
    /// Units in the cart
    #[serde(default, deserialize_with = "quantity_or_zero")]
    pub quantity: Quantity,
}

fn quantity_or_zero<'de, D>(deserializer: D) -> Result<Quantity, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<u32>::deserialize(deserializer)?;
    Ok(value.and_then(|q| Quantity::new(q).ok()).unwrap_or_default())
}

impl LineItem {
    /// Build a line item holding a single unit of `product`.
    pub fn from_product(product: Product) -> Self {
        Self {
            id: product.id,
            title: product.title,
            image_url: product.image_url,
            price: product.price,
            quantity: Quantity::ONE,
        }
    }

    /// Copy of this item with a different quantity.
    pub fn with_quantity(&self, quantity: Quantity) -> Self {
        Self {
            quantity,
            ..self.clone()
        }
    }

    /// The product this line item was created from.
    pub fn product(&self) -> Product {
        Product {
            id: self.id.clone(),
            title: self.title.clone(),
            image_url: self.image_url.clone(),
            price: self.price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_line_item_from_product() {
        let product = Product::new("a", "T", "u", dec!(10)).unwrap();
        let item = LineItem::from_product(product.clone());

        assert_eq!(item.quantity, Quantity::ONE);
        assert_eq!(item.product(), product);
    }

    #[test]
    fn test_line_item_wire_format() {
        let item = LineItem::from_product(Product::new("a", "T", "u", dec!(10.5)).unwrap());
        let value = serde_json::to_value(&item).unwrap();

        assert_eq!(value["id"], "a");
        assert_eq!(value["image_url"], "u");
        assert_eq!(value["price"], 10.5);
        assert_eq!(value["quantity"], 1);
    }

    #[test]
    fn test_line_item_missing_quantity_reads_as_zero() {
        let json = r#"{"id":"a","title":"T","image_url":"u","price":10}"#;
        let item: LineItem = serde_json::from_str(json).unwrap();

        assert!(item.quantity.is_zero());
        assert_eq!(item.price, dec!(10));
    }

    #[test]
    fn test_line_item_null_quantity_reads_as_zero() {
        let json = r#"{"id":"a","title":"T","image_url":"u","price":10,"quantity":null}"#;
        let item: LineItem = serde_json::from_str(json).unwrap();

        assert!(item.quantity.is_zero());
    }

    #[test]
    fn test_price_keeps_every_digit() {
        let price = dec!(1234567.123456789012345);
        let item = LineItem::from_product(Product::new("a", "T", "u", price).unwrap());

        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains(r#""price":1234567.123456789012345"#));

        let restored: LineItem = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.price, price);
        assert_eq!(restored, item);
    }

    #[test]
    fn test_product_rejects_blank_id() {
        assert!(Product::new("", "T", "u", dec!(1)).is_err());

        let json = r#"{"id":" ","title":"T","image_url":"u","price":1}"#;
        assert!(serde_json::from_str::<Product>(json).is_err());
    }
}
