//! Error taxonomy for the reconciliation layer, with Sentry integration.
//!
//! Remote failures are caught at the reconciler boundary. Each one is logged
//! with the collection and filter involved, turned into a single user-facing
//! notice, and (for unexpected failures) captured to Sentry.

use std::sync::Arc;

use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by favorites/cart operations.
///
/// Cloneable so one outcome can be handed to every caller that joined the
/// same in-flight operation.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// A mutation was attempted without an authenticated user.
    #[error("No active session")]
    NoSession,

    /// The row already exists remotely (duplicate insert).
    #[error("Already exists: {0}")]
    ConstraintViolation(Arc<StoreError>),

    /// Network or server failure during a mutation.
    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(Arc<StoreError>),

    /// Re-fetching the collection failed.
    #[error("Fetch failed: {0}")]
    Fetch(Arc<StoreError>),

    /// A cart quantity outside the accepted range.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),
}

impl SyncError {
    /// Classify a failed mutation.
    #[must_use]
    pub fn from_mutation(err: StoreError) -> Self {
        if err.is_constraint_violation() {
            Self::ConstraintViolation(Arc::new(err))
        } else {
            Self::RemoteUnavailable(Arc::new(err))
        }
    }

    /// Classify a failed read.
    #[must_use]
    pub fn from_fetch(err: StoreError) -> Self {
        Self::Fetch(Arc::new(err))
    }

    /// Backend error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::ConstraintViolation(e) | Self::RemoteUnavailable(e) | Self::Fetch(e) => e.code(),
            Self::NoSession | Self::InvalidQuantity(_) => None,
        }
    }
}

/// Result type alias for `SyncError`.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Report an unexpected failure to Sentry and the log.
pub fn capture(err: &SyncError) {
    let event_id = sentry::capture_error(err);
    tracing::error!(
        error = %err,
        code = err.code().unwrap_or("-"),
        sentry_event_id = %event_id,
        "Remote operation failed"
    );
}

/// Set the Sentry user context from a user ID.
///
/// Called when a session is acquired so errors are associated with the user.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Called on sign-out to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("favorites", "toggle", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
