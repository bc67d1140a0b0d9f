//! Bazaar Client - Remote store access and local mirrors of user collections.
//!
//! The marketplace keeps all of its data in a hosted backend (PostgREST-style
//! REST endpoint, row-level security, unique constraints). This crate is the
//! client side of it:
//!
//! - [`store`] - The [`store::RemoteStore`] seam with HTTP and in-memory implementations
//! - [`session`] - Current session and change notification
//! - [`favorites`] / [`cart`] - Local mirrors of the user's favorites and cart,
//!   reconciled with the remote store on every mutation and session change
//! - [`catalog`] - Cached product, category and campaign reads
//! - [`admin`] - Category and campaign management for admins
//! - [`notify`] - User-facing notices
//!
//! # Example
//!
//! ```rust,ignore
//! use bazaar_client::{ClientConfig, FavoritesStore, RestStore, SessionProvider, TracingNotifier};
//!
//! let config = ClientConfig::from_env()?;
//! let store = RestStore::new(&config)?;
//! let sessions = SessionProvider::new(Some(session));
//!
//! let favorites = Arc::new(FavoritesStore::new(
//!     store,
//!     sessions.clone(),
//!     TracingNotifier::new(config.locale),
//! ));
//! favorites.initialize(sessions.current().as_ref()).await;
//! Arc::clone(&favorites).listen(sessions.subscribe());
//!
//! favorites.toggle(&ProductId::from(42)).await;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod admin;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod favorites;
pub mod notify;
pub mod reconcile;
pub mod session;
pub mod store;

pub use admin::{AdminError, CatalogAdmin};
pub use cart::{Cart, CartStore, MAX_QUANTITY};
pub use catalog::{Catalog, CatalogError, PageRequest, ProductPage, RankingWeights};
pub use config::{CacheConfig, ClientConfig, ConfigError};
pub use error::SyncError;
pub use favorites::{Favorites, FavoritesStore};
pub use notify::{Locale, Notice, NoticeLevel, Notifier, RecordingNotifier, TracingNotifier};
pub use reconcile::{CollectionKind, Membership, Reconciler};
pub use session::{Role, Session, SessionEvent, SessionProvider, SessionSubscription};
pub use store::{MemoryStore, RemoteStore, RestStore, StoreError};
