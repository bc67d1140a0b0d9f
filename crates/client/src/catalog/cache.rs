//! Cache types for catalog reads.

use bazaar_core::{Category, CategoryId, Product, ProductId};

use super::ProductPage;

/// Cache key for products, pages and categories.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    Page {
        offset: usize,
        limit: usize,
        category: Option<CategoryId>,
    },
    Categories,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Page(ProductPage),
    Categories(Vec<Category>),
}
