//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for marketplace domain concepts.

pub mod campaign;
pub mod coupon;
pub mod entry;
pub mod id;
pub mod price;
pub mod product;

pub use campaign::{Campaign, Category};
pub use coupon::{CouponCode, CouponCodeError};
pub use entry::{CartLine, FavoriteEntry};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use product::{Product, SellerRef};
