//! The user's favorites.
//!
//! A thin [`CollectionKind`] over the `favorites` collection; everything else
//! is the shared [`Reconciler`].
//!
//! # Example
//!
//! ```rust,ignore
//! let favorites = FavoritesStore::new(store, sessions.clone(), TracingNotifier::default());
//! favorites.initialize(sessions.current().as_ref()).await;
//!
//! if favorites.toggle(&product_id).await {
//!     render_heart(favorites.is_member(&product_id));
//! }
//! ```

use bazaar_core::{FavoriteEntry, Product, ProductId, UserId};
use serde_json::{Value, json};

use crate::notify::Notice;
use crate::reconcile::{CollectionKind, Reconciler};
use crate::store::Collection;

/// Marker for the `favorites` collection.
#[derive(Debug, Clone, Copy)]
pub struct Favorites;

impl CollectionKind for Favorites {
    type Entry = FavoriteEntry;

    const COLLECTION: Collection = Collection::Favorites;
    const LABEL: &'static str = "favorites";

    const ADDED: Notice = Notice::AddedToFavorites;
    const REMOVED: Notice = Notice::RemovedFromFavorites;
    const ALREADY_PRESENT: Notice = Notice::AlreadyInFavorites;

    fn product_id(entry: &FavoriteEntry) -> &ProductId {
        &entry.product_id
    }

    fn product(entry: &FavoriteEntry) -> Option<&Product> {
        entry.product.as_ref()
    }

    fn new_row(user_id: &UserId, product_id: &ProductId) -> Value {
        json!({ "user_id": user_id, "product_id": product_id })
    }
}

/// Favorites mirror for one session.
pub type FavoritesStore<S, N> = Reconciler<Favorites, S, N>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_row_uses_canonical_ids() {
        let row = Favorites::new_row(&UserId::new(" u1 "), &ProductId::from(42));
        assert_eq!(row, json!({ "user_id": "u1", "product_id": "42" }));
    }

    #[test]
    fn test_entry_accessors() {
        let entry: FavoriteEntry =
            serde_json::from_value(json!({ "id": 9, "user_id": "u1", "product_id": 3 })).unwrap();
        assert_eq!(Favorites::product_id(&entry), &ProductId::from(3));
        assert!(Favorites::product(&entry).is_none());
    }
}
