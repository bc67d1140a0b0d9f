//! Remote store access.
//!
//! # Architecture
//!
//! - The remote store (a managed Postgres behind a PostgREST-style API) is the
//!   source of truth - the client never writes local state without confirmation
//! - [`RemoteStore`] is the seam: filtered reads, inserts, updates and deletes
//!   against named collections, authenticated by the current [`Session`]
//! - [`RestStore`] talks HTTP via `reqwest`; [`MemoryStore`] is an in-process
//!   implementation with the same uniqueness rules, used by tests and demo mode
//!
//! # Example
//!
//! ```rust,ignore
//! use bazaar_client::store::{Collection, Embed, Filter, Query, RemoteStore, RestStore};
//!
//! let store = RestStore::new(&config);
//! let rows = store
//!     .select(
//!         Some(&session),
//!         &Query::new(Collection::Favorites)
//!             .filter(Filter::new().eq("user_id", session.user_id.as_str()))
//!             .embed(Embed::PRODUCT),
//!     )
//!     .await?;
//! ```

mod memory;
mod query;
mod rest;

pub use memory::{FailureMode, MemoryStore, StoreCall, StoreOp};
pub use query::{Collection, Condition, Embed, Filter, Order, Query};
pub use rest::RestStore;

use std::future::Future;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::session::Session;

/// Postgres error code for `unique_violation`.
pub const UNIQUE_VIOLATION: &str = "23505";

/// Errors that can occur when talking to the remote store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A uniqueness rule rejected the write.
    #[error("Constraint violation ({code}): {message}")]
    ConstraintViolation { code: String, message: String },

    /// The session token was missing, expired or lacks permission.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Any other non-success response.
    #[error("Remote store returned {status}: {message}")]
    Status {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The request could not be built or would be unsafe to send.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Response body could not be decoded.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl StoreError {
    /// Backend error code, if the store reported one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::ConstraintViolation { code, .. } => Some(code),
            Self::Status { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation { .. })
    }
}

/// Authenticated CRUD over named collections.
///
/// Implementations are expected to be cheaply cloneable handles (`Arc` inside).
/// Every call receives the session to act as; `None` means anonymous access.
pub trait RemoteStore: Clone + Send + Sync + 'static {
    /// Read rows matching `query`.
    fn select(
        &self,
        session: Option<&Session>,
        query: &Query,
    ) -> impl Future<Output = Result<Vec<Value>, StoreError>> + Send;

    /// Insert one row and return the stored representation.
    fn insert(
        &self,
        session: Option<&Session>,
        collection: Collection,
        row: Value,
    ) -> impl Future<Output = Result<Vec<Value>, StoreError>> + Send;

    /// Patch every row matching `filter` and return the updated rows.
    fn update(
        &self,
        session: Option<&Session>,
        collection: Collection,
        filter: &Filter,
        patch: Value,
    ) -> impl Future<Output = Result<Vec<Value>, StoreError>> + Send;

    /// Delete every row matching `filter`.
    fn delete(
        &self,
        session: Option<&Session>,
        collection: Collection,
        filter: &Filter,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Decode raw rows into typed values.
///
/// # Errors
///
/// Returns `StoreError::Parse` on the first row that does not match `T`.
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, StoreError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(StoreError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_code() {
        let err = StoreError::ConstraintViolation {
            code: UNIQUE_VIOLATION.to_string(),
            message: "duplicate key".to_string(),
        };
        assert_eq!(err.code(), Some("23505"));
        assert!(err.is_constraint_violation());

        let err = StoreError::Unauthorized("JWT expired".to_string());
        assert_eq!(err.code(), None);
        assert_eq!(err.to_string(), "Unauthorized: JWT expired");
    }

    #[test]
    fn test_decode_rows_reports_bad_row() {
        #[derive(serde::Deserialize)]
        struct Row {
            #[allow(dead_code)]
            id: i64,
        }

        let rows = vec![serde_json::json!({"id": 1}), serde_json::json!({"id": "x"})];
        assert!(matches!(
            decode_rows::<Row>(rows),
            Err(StoreError::Parse(_))
        ));
    }
}
