//! Command implementations.

pub mod admin;
pub mod cart;
pub mod catalog;
pub mod demo;
pub mod favorites;
pub mod session;

use bazaar_client::{
    AdminError, CacheConfig, CartStore, Catalog, CatalogAdmin, CatalogError, ConfigError,
    FavoritesStore, Locale, Notice, Notifier, RecordingNotifier, RemoteStore, Session,
    SessionProvider, StoreError, SyncError,
};
use bazaar_core::Product;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Remote store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Admin(#[from] AdminError),

    /// A command argument or environment variable is invalid.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Everything a command needs.
pub struct Context<S> {
    pub store: S,
    pub sessions: SessionProvider,
    pub notifier: RecordingNotifier,
    pub locale: Locale,
    pub cache: CacheConfig,
    pub page_size: usize,
}

impl<S: RemoteStore> Context<S> {
    pub fn favorites(&self) -> FavoritesStore<S, RecordingNotifier> {
        FavoritesStore::new(
            self.store.clone(),
            self.sessions.clone(),
            self.notifier.clone(),
        )
    }

    pub fn cart(&self) -> CartStore<S, RecordingNotifier> {
        CartStore::new(
            self.store.clone(),
            self.sessions.clone(),
            self.notifier.clone(),
        )
    }

    pub fn catalog(&self) -> Catalog<S> {
        Catalog::new(self.store.clone(), &self.cache)
    }

    pub fn admin(&self) -> CatalogAdmin<S> {
        CatalogAdmin::new(self.store.clone(), self.sessions.clone()).with_catalog(self.catalog())
    }

    /// The active session, or a sign-in notice.
    pub fn signed_in(&self) -> Result<Session, CliError> {
        self.sessions.current().ok_or_else(|| {
            self.notifier.notify(Notice::SignInRequired);
            CliError::Sync(SyncError::NoSession)
        })
    }

    /// Print every notice raised so far.
    #[allow(clippy::print_stdout)]
    pub fn flush_notices(&self) {
        for notice in self.notifier.drain() {
            println!("{}", notice.message(self.locale));
        }
    }
}

/// One product as a table row.
pub fn product_row(product: &Product) -> String {
    let discount = product
        .discount_percent
        .filter(|percent| *percent > 0)
        .map(|percent| format!(" (-{percent}%)"))
        .unwrap_or_default();
    let stock = if product.is_in_stock() {
        String::new()
    } else {
        " [out of stock]".to_string()
    };
    format!(
        "{:>8}  {:<40} {:>12}{discount}{stock}",
        product.id.as_str(),
        product.name,
        product.sale_price().to_string(),
    )
}
