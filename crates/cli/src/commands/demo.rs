//! Sample data for `--demo`.

use bazaar_client::store::Collection;
use bazaar_client::{MemoryStore, Role, Session};
use bazaar_core::UserId;
use chrono::{Duration, Utc};
use secrecy::SecretString;
use serde_json::json;
use uuid::Uuid;

/// Grid page size in demo mode.
pub const PAGE_SIZE: usize = 6;

struct Sample {
    name: &'static str,
    price: &'static str,
    discount: u8,
    stock: u32,
    sales: u64,
    favorites: u64,
    rating: f64,
    ratings: u64,
    category: i64,
}

const fn sample(
    name: &'static str,
    price: &'static str,
    discount: u8,
    stock: u32,
    (sales, favorites): (u64, u64),
    (rating, ratings): (f64, u64),
    category: i64,
) -> Sample {
    Sample {
        name,
        price,
        discount,
        stock,
        sales,
        favorites,
        rating,
        ratings,
        category,
    }
}

const PRODUCTS: &[Sample] = &[
    sample("Linen Shirt", "749.90", 0, 12, (310, 88), (4.6, 120), 1),
    sample("Denim Jacket", "1299.00", 15, 4, (95, 140), (4.4, 60), 1),
    sample("Wool Scarf", "349.50", 0, 0, (410, 35), (4.1, 210), 1),
    sample("Leather Tote", "1899.00", 10, 7, (58, 97), (4.8, 32), 2),
    sample("Canvas Backpack", "899.90", 0, 21, (175, 64), (4.3, 88), 2),
    sample("Running Shoes", "2149.00", 20, 15, (520, 230), (4.7, 640), 3),
    sample("Suede Loafers", "1649.00", 0, 3, (12, 9), (3.9, 7), 3),
    sample("Silk Tie", "429.00", 0, 30, (2, 1), (0.0, 0), 1),
];

/// Fill `store` with categories, products and campaigns.
pub fn seed(store: &MemoryStore) {
    store.seed(
        Collection::Categories,
        [
            json!({ "id": 1, "name": "Clothing", "slug": "clothing" }),
            json!({ "id": 2, "name": "Bags", "slug": "bags" }),
            json!({ "id": 3, "name": "Shoes", "slug": "shoes" }),
        ],
    );

    let now = Utc::now();
    store.seed(
        Collection::Products,
        PRODUCTS.iter().zip(1_i64..).map(|(p, id)| {
            json!({
                "id": id,
                "name": p.name,
                "price": p.price,
                "currency": "TRY",
                "discount_percent": (p.discount > 0).then_some(p.discount),
                "stock": p.stock,
                "sales_count": p.sales,
                "favorite_count": p.favorites,
                "rating": p.rating,
                "rating_count": p.ratings,
                "category_id": p.category,
                "seller": { "id": "s-1", "name": "Atelier Demo" },
                "created_at": now - Duration::days(id * 9),
            })
        }),
    );

    store.seed(
        Collection::Campaigns,
        [
            json!({ "code": "WELCOME10", "discount_percent": 10, "active": true }),
            json!({
                "code": "FLASH-30",
                "discount_percent": 30,
                "active": true,
                "expires_at": now + Duration::days(2),
            }),
        ],
    );
}

/// Session used when the environment does not provide one.
///
/// Demo users are admins so every command can be tried.
pub fn session() -> Session {
    Session::new(
        UserId::new(Uuid::new_v4().to_string()),
        SecretString::from("demo-token"),
        Utc::now() + Duration::hours(1),
        Role::Admin,
    )
}
