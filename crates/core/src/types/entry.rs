//! Rows of the user-owned collections mirrored by the client.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::product::Product;

/// A product the user marked as favorite.
///
/// `product` is the joined product projection. It is `None` when the join
/// failed upstream (e.g., the product was deleted), so callers rendering
/// snapshots must filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub product_id: ProductId,
    #[serde(default)]
    pub product: Option<Product>,
}

/// A line in the user's cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub product: Option<Product>,
}

const fn default_quantity() -> u32 {
    1
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_favorite_without_join() {
        let entry: FavoriteEntry =
            serde_json::from_value(serde_json::json!({ "product_id": 12, "product": null }))
                .unwrap();
        assert_eq!(entry.product_id, ProductId::from(12));
        assert!(entry.product.is_none());
    }

    #[test]
    fn test_cart_line_defaults_quantity() {
        let line: CartLine =
            serde_json::from_value(serde_json::json!({ "product_id": "12" })).unwrap();
        assert_eq!(line.quantity, 1);
    }
}
