//! Product projection as served by the remote store.
//!
//! Products are owned by the remote store. The client only ever holds
//! immutable copies, either embedded in favorite/cart rows or cached by the
//! catalog.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CategoryId, ProductId, SellerId};
use super::price::{CurrencyCode, Price};

/// Seller reference embedded in product rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerRef {
    pub id: SellerId,
    #[serde(default)]
    pub name: Option<String>,
}

/// Read-only product projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// List price before any discount.
    pub price: Decimal,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default)]
    pub discount_percent: Option<u8>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub seller_id: Option<SellerId>,
    #[serde(default)]
    pub seller: Option<SellerRef>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub sales_count: u64,
    #[serde(default)]
    pub favorite_count: u64,
    /// Average rating in `0.0..=5.0`.
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub rating_count: u64,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Price before discount.
    #[must_use]
    pub const fn list_price(&self) -> Price {
        Price::new(self.price, self.currency)
    }

    /// Price the customer pays for one unit.
    #[must_use]
    pub fn sale_price(&self) -> Price {
        match self.discount_percent {
            Some(percent) if percent > 0 => self.list_price().discounted(percent),
            _ => self.list_price(),
        }
    }

    #[must_use]
    pub const fn is_in_stock(&self) -> bool {
        self.stock > 0
    }
}
