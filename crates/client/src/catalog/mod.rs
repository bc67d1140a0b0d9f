//! Read side of the product catalog.
//!
//! Products, pages and categories are cached with `moka` (TTL and capacity
//! from [`CacheConfig`]). Campaigns are never cached since their validity
//! depends on the clock.
//!
//! All reads are anonymous: the catalog is public and needs no session.

mod cache;
mod ranking;

pub use ranking::{RankingWeights, rank, score};

use std::sync::Arc;

use bazaar_core::{Campaign, Category, CategoryId, Product, ProductId};
use chrono::{DateTime, Utc};
use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::CacheConfig;
use crate::store::{Collection, Filter, Query, RemoteStore, StoreError, decode_rows};
use cache::{CacheKey, CacheValue};

/// Candidates fetched per requested shelf item before ranking.
const CANDIDATES_PER_ITEM: usize = 4;

/// Smallest candidate window for a shelf.
const MIN_CANDIDATES: usize = 48;

/// Errors from catalog reads.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product not found: {0}")]
    NotFound(ProductId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One request of the infinite-scroll product grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
    pub category: Option<CategoryId>,
}

impl PageRequest {
    /// The first page of `limit` products.
    #[must_use]
    pub const fn first(limit: usize) -> Self {
        Self {
            offset: 0,
            limit,
            category: None,
        }
    }

    /// Restrict to one category.
    #[must_use]
    pub fn in_category(mut self, category: CategoryId) -> Self {
        self.category = Some(category);
        self
    }

    /// The request following `page`, or `None` when the grid is exhausted.
    #[must_use]
    pub fn next(&self, page: &ProductPage) -> Option<Self> {
        page.next_offset.map(|offset| Self {
            offset,
            limit: self.limit,
            category: self.category.clone(),
        })
    }
}

/// A slice of the product grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPage {
    pub items: Vec<Product>,
    /// Offset of the next page, `None` when there are no more products.
    pub next_offset: Option<usize>,
}

/// Catalog reader.
///
/// Cheaply cloneable; clones share the cache.
#[derive(Clone)]
pub struct Catalog<S> {
    inner: Arc<CatalogInner<S>>,
}

struct CatalogInner<S> {
    store: S,
    cache: Cache<CacheKey, CacheValue>,
    best_sellers: RankingWeights,
    new_arrivals: RankingWeights,
}

impl<S: RemoteStore> Catalog<S> {
    /// Create a catalog with the default shelf weights.
    #[must_use]
    pub fn new(store: S, cache: &CacheConfig) -> Self {
        Self::with_weights(
            store,
            cache,
            RankingWeights::BEST_SELLERS,
            RankingWeights::NEW_ARRIVALS,
        )
    }

    /// Create a catalog with custom shelf weights.
    #[must_use]
    pub fn with_weights(
        store: S,
        cache: &CacheConfig,
        best_sellers: RankingWeights,
        new_arrivals: RankingWeights,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(cache.capacity)
            .time_to_live(cache.ttl)
            .build();

        Self {
            inner: Arc::new(CatalogInner {
                store,
                cache,
                best_sellers,
                new_arrivals,
            }),
        }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Get one product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no product has this id, or
    /// `CatalogError::Store` if the read fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Result<Product, CatalogError> {
        let cache_key = CacheKey::Product(id.clone());

        // Check cache
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let query = Query::new(Collection::Products)
            .filter(Filter::new().eq("id", id))
            .limit(1);
        let rows = self.inner.store.select(None, &query).await?;
        let product = decode_rows::<Product>(rows)?
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::NotFound(id.clone()))?;

        // Cache the result
        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Get one page of the product grid, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Store` if the read fails.
    #[instrument(skip(self), fields(offset = request.offset, limit = request.limit))]
    pub async fn page(&self, request: &PageRequest) -> Result<ProductPage, CatalogError> {
        let cache_key = CacheKey::Page {
            offset: request.offset,
            limit: request.limit,
            category: request.category.clone(),
        };

        if let Some(CacheValue::Page(page)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for page");
            return Ok(page);
        }

        let mut filter = Filter::new();
        if let Some(category) = &request.category {
            filter = filter.eq("category_id", category);
        }
        // One extra row tells whether another page exists
        let query = Query::new(Collection::Products)
            .filter(filter)
            .order_by("created_at", true)
            .offset(request.offset)
            .limit(request.limit.saturating_add(1));

        let rows = self.inner.store.select(None, &query).await?;
        let mut items = decode_rows::<Product>(rows)?;
        let next_offset = (items.len() > request.limit)
            .then(|| request.offset.saturating_add(request.limit));
        items.truncate(request.limit);

        for product in &items {
            self.inner
                .cache
                .insert(
                    CacheKey::Product(product.id.clone()),
                    CacheValue::Product(Box::new(product.clone())),
                )
                .await;
        }

        let page = ProductPage { items, next_offset };
        self.inner
            .cache
            .insert(cache_key, CacheValue::Page(page.clone()))
            .await;

        Ok(page)
    }

    /// Best-selling shelf.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Store` if the read fails.
    #[instrument(skip(self))]
    pub async fn best_sellers(&self, limit: usize) -> Result<Vec<Product>, CatalogError> {
        let candidates = self.candidates("sales_count", limit).await?;
        Ok(rank(candidates, &self.inner.best_sellers, Utc::now(), limit))
    }

    /// New-arrivals shelf.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Store` if the read fails.
    #[instrument(skip(self))]
    pub async fn new_arrivals(&self, limit: usize) -> Result<Vec<Product>, CatalogError> {
        let candidates = self.candidates("created_at", limit).await?;
        Ok(rank(candidates, &self.inner.new_arrivals, Utc::now(), limit))
    }

    /// Top rows by `column`, wide enough for ranking to reorder.
    async fn candidates(&self, column: &str, limit: usize) -> Result<Vec<Product>, CatalogError> {
        let window = limit.saturating_mul(CANDIDATES_PER_ITEM).max(MIN_CANDIDATES);
        let query = Query::new(Collection::Products)
            .order_by(column, true)
            .limit(window);
        let rows = self.inner.store.select(None, &query).await?;
        decode_rows(rows).map_err(CatalogError::from)
    }

    // =========================================================================
    // Categories and campaigns
    // =========================================================================

    /// All categories, by name.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Store` if the read fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let query = Query::new(Collection::Categories).order_by("name", false);
        let rows = self.inner.store.select(None, &query).await?;
        let categories: Vec<Category> = decode_rows(rows)?;

        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone()),
            )
            .await;

        Ok(categories)
    }

    /// Campaigns a customer can redeem at `now`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Store` if the read fails.
    #[instrument(skip(self))]
    pub async fn active_campaigns(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Campaign>, CatalogError> {
        let query = Query::new(Collection::Campaigns)
            .filter(Filter::new().eq("active", true))
            .order_by("code", false);
        let rows = self.inner.store.select(None, &query).await?;
        let campaigns: Vec<Campaign> = decode_rows(rows)?;
        Ok(campaigns
            .into_iter()
            .filter(|c| c.is_redeemable(now))
            .collect())
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Invalidate a cached product.
    pub async fn invalidate_product(&self, id: &ProductId) {
        self.inner
            .cache
            .invalidate(&CacheKey::Product(id.clone()))
            .await;
    }

    /// Invalidate cached categories.
    pub async fn invalidate_categories(&self) {
        self.inner.cache.invalidate(&CacheKey::Categories).await;
    }

    /// Invalidate all cached data.
    pub fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
    }
}
