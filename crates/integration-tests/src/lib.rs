//! Integration tests for the Bazaar client.
//!
//! The tests in `tests/` drive the public API of `bazaar-client` end to end
//! against [`MemoryStore`], which enforces the same unique constraints and
//! row-level security as the hosted store. Nothing here needs a network.
//!
//! This module holds the fixtures they share.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::time::Duration;

use bazaar_client::store::Collection;
use bazaar_client::{
    CartStore, FavoritesStore, MemoryStore, RecordingNotifier, Role, Session, SessionProvider,
};
use bazaar_core::UserId;
use chrono::{Duration as TimeDelta, Utc};
use secrecy::SecretString;
use serde_json::{Value, json};

/// Number of products in the seeded catalog. Their ids are `1..=PRODUCT_COUNT`.
pub const PRODUCT_COUNT: i64 = 10;

/// A customer session for `user`.
#[must_use]
pub fn session(user: &str) -> Session {
    session_with_role(user, Role::Customer)
}

/// An admin session for `user`.
#[must_use]
pub fn admin_session(user: &str) -> Session {
    session_with_role(user, Role::Admin)
}

fn session_with_role(user: &str, role: Role) -> Session {
    Session::new(
        UserId::new(user),
        SecretString::from(format!("token-{user}")),
        Utc::now() + TimeDelta::hours(1),
        role,
    )
}

/// A product row as the hosted store returns it.
#[must_use]
pub fn product_row(id: i64, price: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Product {id}"),
        "price": price,
        "currency": "TRY",
        "stock": 5,
        "sales_count": id * 10,
        "created_at": Utc::now() - TimeDelta::days(id),
    })
}

/// Canonical product ids stored remotely in `collection` for `user`.
#[must_use]
pub fn remote_product_ids(store: &MemoryStore, collection: Collection, user: &str) -> Vec<String> {
    store
        .rows(collection)
        .iter()
        .filter(|row| id_cell(row, "user_id").as_deref() == Some(user))
        .filter_map(|row| id_cell(row, "product_id"))
        .collect()
}

fn id_cell(row: &Value, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A seeded store, a session provider and a notifier to build mirrors from.
pub struct Harness {
    pub store: MemoryStore,
    pub sessions: SessionProvider,
    pub notifier: RecordingNotifier,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    /// Seeded catalog, no session.
    #[must_use]
    pub fn new() -> Self {
        Self::from_store(MemoryStore::new())
    }

    /// Seeded catalog where every remote call takes `latency`.
    #[must_use]
    pub fn with_latency(latency: Duration) -> Self {
        Self::from_store(MemoryStore::new().with_latency(latency))
    }

    /// Seeded catalog with `user` signed in.
    #[must_use]
    pub fn signed_in(user: &str) -> Self {
        let harness = Self::new();
        harness.sessions.sign_in(session(user));
        harness
    }

    fn from_store(store: MemoryStore) -> Self {
        store.seed(
            Collection::Products,
            (1..=PRODUCT_COUNT).map(|id| product_row(id, &format!("{id}00.00"))),
        );
        Self {
            store,
            sessions: SessionProvider::new(None),
            notifier: RecordingNotifier::new(),
        }
    }

    /// A favorites mirror sharing this harness's store, sessions and notifier.
    #[must_use]
    pub fn favorites(&self) -> FavoritesStore<MemoryStore, RecordingNotifier> {
        FavoritesStore::new(
            self.store.clone(),
            self.sessions.clone(),
            self.notifier.clone(),
        )
    }

    /// A cart mirror sharing this harness's store, sessions and notifier.
    #[must_use]
    pub fn cart(&self) -> CartStore<MemoryStore, RecordingNotifier> {
        CartStore::new(
            self.store.clone(),
            self.sessions.clone(),
            self.notifier.clone(),
        )
    }

    /// Favorite rows written directly, as another client would have.
    pub fn seed_favorites(&self, user: &str, products: &[i64]) {
        self.store.seed(
            Collection::Favorites,
            products
                .iter()
                .map(|product| json!({ "user_id": user, "product_id": product })),
        );
    }

    /// Cart rows written directly, as another client would have.
    pub fn seed_cart(&self, user: &str, lines: &[(i64, u32)]) {
        self.store.seed(
            Collection::CartItems,
            lines.iter().map(|(product, quantity)| {
                json!({ "user_id": user, "product_id": product, "quantity": quantity })
            }),
        );
    }
}

/// Poll `condition` until it holds or a second has passed.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
