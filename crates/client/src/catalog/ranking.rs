//! Weighted-sum ordering for the home page shelves.
//!
//! Each signal is squashed into a comparable range first (log for counters,
//! 0..1 for rating and freshness) so one runaway counter cannot drown out
//! the others.

use std::cmp::Ordering;

use bazaar_core::Product;
use chrono::{DateTime, Utc};

/// Freshness halves every this many days.
const FRESHNESS_HALF_LIFE_DAYS: f64 = 14.0;

/// Highest rating a product can have.
const MAX_RATING: f64 = 5.0;

/// Weight of each signal in a product's score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingWeights {
    pub sales: f64,
    pub favorites: f64,
    pub rating: f64,
    pub recency: f64,
}

impl RankingWeights {
    /// Proven sellers first.
    pub const BEST_SELLERS: Self = Self {
        sales: 1.0,
        favorites: 0.5,
        rating: 1.0,
        recency: 0.0,
    };

    /// Recent listings first, nudged by early traction.
    pub const NEW_ARRIVALS: Self = Self {
        sales: 0.2,
        favorites: 0.2,
        rating: 0.5,
        recency: 3.0,
    };
}

#[allow(clippy::cast_precision_loss)]
fn log_count(count: u64) -> f64 {
    (count as f64).ln_1p()
}

/// Rating in 0..1, discounted while there are few ratings.
#[allow(clippy::cast_precision_loss)]
fn rating_signal(product: &Product) -> f64 {
    let rating = product.rating.clamp(0.0, MAX_RATING) / MAX_RATING;
    let confidence = 1.0 - 1.0 / (1.0 + product.rating_count as f64);
    rating * confidence
}

/// 1.0 for a product listed `now`, halving every half-life.
#[allow(clippy::cast_precision_loss)]
fn freshness(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_hours = (now - created_at).num_hours().max(0) as f64;
    0.5_f64.powf(age_hours / 24.0 / FRESHNESS_HALF_LIFE_DAYS)
}

/// Score of one product.
#[must_use]
pub fn score(product: &Product, weights: &RankingWeights, now: DateTime<Utc>) -> f64 {
    weights.sales * log_count(product.sales_count)
        + weights.favorites * log_count(product.favorite_count)
        + weights.rating * rating_signal(product)
        + weights.recency * freshness(product.created_at, now)
}

/// Sort by descending score, ties by product id, and keep the first `limit`.
#[must_use]
pub fn rank(
    products: Vec<Product>,
    weights: &RankingWeights,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<Product> {
    let mut scored: Vec<(f64, Product)> = products
        .into_iter()
        .map(|p| (score(&p, weights, now), p))
        .collect();

    scored.sort_by(|(a_score, a), (b_score, b)| match b_score.total_cmp(a_score) {
        Ordering::Equal => a.id.cmp(&b.id),
        other => other,
    });

    scored.into_iter().take(limit).map(|(_, p)| p).collect()
}
