//! In-process implementation of [`RemoteStore`].
//!
//! Behaves like the hosted store for everything the client relies on:
//! uniqueness constraints (`23505`), id assignment, embedded joins, ordering
//! and paging, and ownership checks on user-owned collections. It also
//! records every call and can inject failures and latency, which is what the
//! reconciliation tests and the CLI demo mode use it for.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bazaar_core::types::id::canonicalize;
use chrono::Utc;
use serde_json::{Map, Value};

use super::{Collection, Filter, Query, RemoteStore, StoreError, UNIQUE_VIOLATION};
use crate::session::Session;

/// Kind of remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Select,
    Insert,
    Update,
    Delete,
}

/// A recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub collection: Collection,
    /// Rendered filter, e.g. `user_id=eq.u1`.
    pub filter: String,
}

/// Failure to inject into the next matching call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Server error (HTTP 503).
    Unavailable,
    /// Token rejected (HTTP 401).
    Unauthorized,
}

impl FailureMode {
    fn into_error(self) -> StoreError {
        match self {
            Self::Unavailable => StoreError::Status {
                status: 503,
                code: None,
                message: "service unavailable".to_string(),
            },
            Self::Unauthorized => StoreError::Unauthorized("JWT expired".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct InjectedFailure {
    op: StoreOp,
    collection: Option<Collection>,
    mode: FailureMode,
}

#[derive(Default)]
struct State {
    tables: HashMap<Collection, Vec<Value>>,
    next_id: u64,
    calls: Vec<StoreCall>,
    failures: Vec<InjectedFailure>,
    latency: Duration,
}

/// In-memory remote store.
///
/// Cheaply cloneable; clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<State>>,
}

/// Columns that must be unique together, per collection. `id` is always unique.
const fn unique_key(collection: Collection) -> &'static [&'static str] {
    match collection {
        Collection::Favorites | Collection::CartItems => &["user_id", "product_id"],
        Collection::Categories => &["slug"],
        Collection::Campaigns => &["code"],
        Collection::Products => &[],
    }
}

const fn is_user_owned(collection: Collection) -> bool {
    matches!(collection, Collection::Favorites | Collection::CartItems)
}

/// Canonical string form of a cell, `None` for null or missing.
fn cell(row: &Value, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) => Some(canonicalize(s)),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn matches_filter(row: &Value, filter: &Filter) -> bool {
    filter
        .conditions()
        .iter()
        .all(|c| cell(row, c.column()).is_some_and(|v| c.matches(&v)))
}

fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        // Nulls sort last, as in Postgres ascending order
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` before it is applied.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state().latency = latency;
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert rows directly, bypassing constraints and call recording.
    pub fn seed(&self, collection: Collection, rows: impl IntoIterator<Item = Value>) {
        let mut state = self.state();
        for row in rows {
            let row = state.prepare_row(row);
            state.tables.entry(collection).or_default().push(row);
        }
    }

    /// Current contents of a collection.
    #[must_use]
    pub fn rows(&self, collection: Collection) -> Vec<Value> {
        self.state()
            .tables
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Every call made so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<StoreCall> {
        self.state().calls.clone()
    }

    /// Number of calls of one kind against one collection.
    #[must_use]
    pub fn call_count(&self, op: StoreOp, collection: Collection) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.op == op && c.collection == collection)
            .count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Fail the next `op` call (against `collection`, or any collection).
    pub fn fail_next(&self, op: StoreOp, collection: Option<Collection>, mode: FailureMode) {
        self.state().failures.push(InjectedFailure {
            op,
            collection,
            mode,
        });
    }

    /// Record the call, consume a matching injected failure, then wait out
    /// the configured latency.
    async fn begin(
        &self,
        op: StoreOp,
        collection: Collection,
        filter: &Filter,
    ) -> Result<(), StoreError> {
        let (latency, failure) = {
            let mut state = self.state();
            state.calls.push(StoreCall {
                op,
                collection,
                filter: filter.to_string(),
            });
            let position = state.failures.iter().position(|f| {
                f.op == op && f.collection.is_none_or(|c| c == collection)
            });
            let failure = position.map(|i| state.failures.remove(i));
            (state.latency, failure)
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        match failure {
            Some(failure) => Err(failure.mode.into_error()),
            None => Ok(()),
        }
    }
}

impl State {
    /// Assign `id` and `created_at` when missing. Explicit integer ids move
    /// the sequence past them.
    fn prepare_row(&mut self, row: Value) -> Value {
        let mut object = match row {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        match object.get("id").map(Value::as_u64) {
            Some(Some(explicit)) => self.next_id = self.next_id.max(explicit),
            Some(None) => {}
            None => {
                self.next_id += 1;
                object.insert("id".to_string(), Value::from(self.next_id));
            }
        }
        object
            .entry("created_at")
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
        Value::Object(object)
    }

    fn check_unique(&self, collection: Collection, row: &Value) -> Result<(), StoreError> {
        let rows = self.tables.get(&collection).map_or(&[][..], Vec::as_slice);

        let same = |existing: &Value, columns: &[&str]| {
            columns
                .iter()
                .all(|col| cell(existing, col).is_some() && cell(existing, col) == cell(row, col))
        };

        for columns in [&["id"][..], unique_key(collection)] {
            if columns.is_empty() {
                continue;
            }
            if rows.iter().any(|existing| same(existing, columns)) {
                return Err(StoreError::ConstraintViolation {
                    code: UNIQUE_VIOLATION.to_string(),
                    message: format!(
                        "duplicate key value violates unique constraint \"{collection}_{}_key\"",
                        columns.join("_")
                    ),
                });
            }
        }
        Ok(())
    }

    fn embed_rows(&self, mut row: Value, query: &Query) -> Value {
        for embed in &query.embeds {
            let target = cell(&row, embed.foreign_key).and_then(|key| {
                self.tables.get(&embed.collection).and_then(|rows| {
                    rows.iter()
                        .find(|r| cell(r, "id").as_deref() == Some(key.as_str()))
                        .cloned()
                })
            });
            if let Value::Object(map) = &mut row {
                map.insert(embed.alias.to_string(), target.unwrap_or(Value::Null));
            }
        }
        row
    }
}

/// Row-level security as configured on the hosted store.
fn authorize_write(
    session: Option<&Session>,
    collection: Collection,
    row_owner: Option<String>,
) -> Result<(), StoreError> {
    let session =
        session.ok_or_else(|| StoreError::Unauthorized("authentication required".to_string()))?;

    if is_user_owned(collection) {
        if let Some(owner) = row_owner
            && owner != session.user_id.as_str()
        {
            return Err(StoreError::Unauthorized(
                "row belongs to another user".to_string(),
            ));
        }
    } else if !session.is_admin() {
        return Err(StoreError::Unauthorized(format!(
            "admin role required to modify {collection}"
        )));
    }
    Ok(())
}

impl RemoteStore for MemoryStore {
    async fn select(
        &self,
        session: Option<&Session>,
        query: &Query,
    ) -> Result<Vec<Value>, StoreError> {
        self.begin(StoreOp::Select, query.collection, &query.filter)
            .await?;

        if is_user_owned(query.collection) && session.is_none() {
            return Err(StoreError::Unauthorized(
                "authentication required".to_string(),
            ));
        }

        let state = self.state();
        let mut rows: Vec<Value> = state
            .tables
            .get(&query.collection)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_filter(row, &query.filter))
                    .filter(|row| {
                        // Users only ever see their own favorites and cart lines
                        !is_user_owned(query.collection)
                            || session.is_some_and(|s| {
                                cell(row, "user_id").as_deref() == Some(s.user_id.as_str())
                            })
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_cells(a.get(&order.column), b.get(&order.column));
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| state.embed_rows(row, query))
            .collect())
    }

    async fn insert(
        &self,
        session: Option<&Session>,
        collection: Collection,
        row: Value,
    ) -> Result<Vec<Value>, StoreError> {
        self.begin(StoreOp::Insert, collection, &Filter::new())
            .await?;
        authorize_write(session, collection, cell(&row, "user_id"))?;

        let mut state = self.state();
        let row = state.prepare_row(row);
        state.check_unique(collection, &row)?;
        state.tables.entry(collection).or_default().push(row.clone());
        Ok(vec![row])
    }

    async fn update(
        &self,
        session: Option<&Session>,
        collection: Collection,
        filter: &Filter,
        patch: Value,
    ) -> Result<Vec<Value>, StoreError> {
        self.begin(StoreOp::Update, collection, filter).await?;
        if filter.is_empty() {
            return Err(StoreError::InvalidRequest(
                "refusing to update without a filter".to_string(),
            ));
        }
        authorize_write(session, collection, None)?;

        let Value::Object(patch) = patch else {
            return Err(StoreError::InvalidRequest(
                "patch must be a JSON object".to_string(),
            ));
        };

        let owner = session.map(|s| s.user_id.as_str().to_owned());
        let mut state = self.state();
        let mut updated = Vec::new();
        if let Some(rows) = state.tables.get_mut(&collection) {
            for row in rows.iter_mut().filter(|row| {
                matches_filter(row, filter)
                    && (!is_user_owned(collection) || cell(row, "user_id") == owner)
            }) {
                if let Value::Object(map) = row {
                    for (key, value) in &patch {
                        map.insert(key.clone(), value.clone());
                    }
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(
        &self,
        session: Option<&Session>,
        collection: Collection,
        filter: &Filter,
    ) -> Result<(), StoreError> {
        self.begin(StoreOp::Delete, collection, filter).await?;
        if filter.is_empty() {
            return Err(StoreError::InvalidRequest(
                "refusing to delete without a filter".to_string(),
            ));
        }
        authorize_write(session, collection, None)?;

        let owner = session.map(|s| s.user_id.as_str().to_owned());
        let mut state = self.state();
        if let Some(rows) = state.tables.get_mut(&collection) {
            rows.retain(|row| {
                !(matches_filter(row, filter)
                    && (!is_user_owned(collection) || cell(row, "user_id") == owner))
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::UserId;
    use chrono::Duration as ChronoDuration;
    use secrecy::SecretString;
    use serde_json::json;

    use super::*;
    use crate::session::Role;
    use crate::store::Embed;

    fn session(user: &str, role: Role) -> Session {
        Session::new(
            UserId::new(user),
            SecretString::from("token"),
            Utc::now() + ChronoDuration::hours(1),
            role,
        )
    }

    #[tokio::test]
    async fn test_insert_enforces_unique_pair() {
        let store = MemoryStore::new();
        let s = session("u1", Role::Customer);
        let row = json!({"user_id": "u1", "product_id": 5});

        store
            .insert(Some(&s), Collection::Favorites, row.clone())
            .await
            .unwrap();
        let err = store
            .insert(Some(&s), Collection::Favorites, json!({"user_id": "u1", "product_id": "5"}))
            .await
            .unwrap_err();

        assert!(err.is_constraint_violation());
        assert_eq!(store.rows(Collection::Favorites).len(), 1);
    }

    #[tokio::test]
    async fn test_select_joins_and_scopes_to_user() {
        let store = MemoryStore::new();
        store.seed(
            Collection::Products,
            [json!({"id": 5, "name": "Mug", "price": "10"})],
        );
        store.seed(
            Collection::Favorites,
            [
                json!({"user_id": "u1", "product_id": 5}),
                json!({"user_id": "u2", "product_id": 5}),
            ],
        );

        let s = session("u1", Role::Customer);
        let rows = store
            .select(
                Some(&s),
                &Query::new(Collection::Favorites).embed(Embed::PRODUCT),
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["product"]["name"], "Mug");
    }

    #[tokio::test]
    async fn test_select_orders_and_pages() {
        let store = MemoryStore::new();
        store.seed(
            Collection::Products,
            (1..=5).map(|i| json!({"id": i, "sales_count": i * 10})),
        );

        let rows = store
            .select(
                None,
                &Query::new(Collection::Products)
                    .order_by("sales_count", true)
                    .offset(1)
                    .limit(2),
            )
            .await
            .unwrap();

        let ids: Vec<i64> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![4, 3]);
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed_once() {
        let store = MemoryStore::new();
        store.fail_next(StoreOp::Select, None, FailureMode::Unavailable);

        let query = Query::new(Collection::Categories);
        assert!(matches!(
            store.select(None, &query).await,
            Err(StoreError::Status { status: 503, .. })
        ));
        assert!(store.select(None, &query).await.is_ok());
        assert_eq!(store.call_count(StoreOp::Select, Collection::Categories), 2);
    }

    #[tokio::test]
    async fn test_catalog_writes_require_admin() {
        let store = MemoryStore::new();
        let customer = session("u1", Role::Customer);
        let admin = session("a1", Role::Admin);
        let row = json!({"name": "Shoes", "slug": "shoes"});

        assert!(matches!(
            store
                .insert(Some(&customer), Collection::Categories, row.clone())
                .await,
            Err(StoreError::Unauthorized(_))
        ));
        assert!(
            store
                .insert(Some(&admin), Collection::Categories, row)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_delete_only_touches_own_rows() {
        let store = MemoryStore::new();
        store.seed(
            Collection::CartItems,
            [
                json!({"user_id": "u1", "product_id": 1}),
                json!({"user_id": "u2", "product_id": 1}),
            ],
        );

        let s = session("u1", Role::Customer);
        store
            .delete(
                Some(&s),
                Collection::CartItems,
                &Filter::new().eq("product_id", 1),
            )
            .await
            .unwrap();

        let remaining = store.rows(Collection::CartItems);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0]["user_id"], "u2");
    }
}
