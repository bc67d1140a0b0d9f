//! Catalog administration: categories and coupon campaigns.
//!
//! Every operation requires a session with the `admin` role. The check here
//! only fails fast; the remote store's row-level security is what actually
//! enforces it.

use bazaar_core::{Campaign, CampaignId, Category, CategoryId, CouponCode, CouponCodeError};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::instrument;

use crate::catalog::Catalog;
use crate::error::add_breadcrumb;
use crate::session::{Session, SessionProvider};
use crate::store::{Collection, Filter, RemoteStore, StoreError, decode_rows};

/// Errors from admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("No active session")]
    NoSession,

    #[error("Admin role required")]
    NotAdmin,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<CouponCodeError> for AdminError {
    fn from(err: CouponCodeError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Map a store error, turning uniqueness violations into `AlreadyExists`.
fn conflict(what: impl Into<String>) -> impl FnOnce(StoreError) -> AdminError {
    let what = what.into();
    move |err| {
        if err.is_constraint_violation() {
            AdminError::AlreadyExists(what)
        } else {
            AdminError::Store(err)
        }
    }
}

/// Derive a URL slug from a display name.
///
/// Lower-cases, folds Turkish letters to ASCII and joins words with `-`.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars().flat_map(char::to_lowercase) {
        let ch = match ch {
            'ç' => 'c',
            'ğ' => 'g',
            'ı' => 'i',
            'ö' => 'o',
            'ş' => 's',
            'ü' => 'u',
            other => other,
        };
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Write access to categories and campaigns.
pub struct CatalogAdmin<S> {
    store: S,
    sessions: SessionProvider,
    catalog: Option<Catalog<S>>,
}

impl<S: RemoteStore> CatalogAdmin<S> {
    #[must_use]
    pub const fn new(store: S, sessions: SessionProvider) -> Self {
        Self {
            store,
            sessions,
            catalog: None,
        }
    }

    /// Invalidate `catalog`'s cached categories after category changes.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Catalog<S>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    fn require_admin(&self) -> Result<Session, AdminError> {
        let session = self.sessions.current().ok_or(AdminError::NoSession)?;
        if !session.is_admin() {
            tracing::warn!(user_id = %session.user_id, "Admin operation refused");
            return Err(AdminError::NotAdmin);
        }
        Ok(session)
    }

    async fn categories_changed(&self) {
        if let Some(catalog) = &self.catalog {
            catalog.invalidate_categories().await;
        }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Create a category. The slug is derived from the name.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Validation` for a name without letters or digits,
    /// `AdminError::AlreadyExists` if the slug is taken.
    #[instrument(skip(self))]
    pub async fn create_category(&self, name: &str) -> Result<Category, AdminError> {
        let session = self.require_admin()?;
        let (name, slug) = category_fields(name)?;
        add_breadcrumb("admin", "create_category", Some(&[("slug", slug.as_str())]));

        let rows = self
            .store
            .insert(
                Some(&session),
                Collection::Categories,
                json!({ "name": name, "slug": slug }),
            )
            .await
            .map_err(conflict(format!("category '{slug}'")))?;

        let category: Category = single(rows, || format!("category '{slug}'"))?;
        tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");
        self.categories_changed().await;
        Ok(category)
    }

    /// Rename a category, re-deriving its slug.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NotFound` if no category has this id,
    /// `AdminError::AlreadyExists` if the new slug is taken.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn rename_category(
        &self,
        id: &CategoryId,
        name: &str,
    ) -> Result<Category, AdminError> {
        let session = self.require_admin()?;
        let (name, slug) = category_fields(name)?;

        let rows = self
            .store
            .update(
                Some(&session),
                Collection::Categories,
                &Filter::new().eq("id", id),
                json!({ "name": name, "slug": slug }),
            )
            .await
            .map_err(conflict(format!("category '{slug}'")))?;

        let category: Category = single(rows, || format!("category {id}"))?;
        self.categories_changed().await;
        Ok(category)
    }

    /// Delete a category.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Store` if the remote store rejects the delete.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn delete_category(&self, id: &CategoryId) -> Result<(), AdminError> {
        let session = self.require_admin()?;
        self.store
            .delete(
                Some(&session),
                Collection::Categories,
                &Filter::new().eq("id", id),
            )
            .await
            .map_err(AdminError::Store)?;
        self.categories_changed().await;
        Ok(())
    }

    // =========================================================================
    // Campaigns
    // =========================================================================

    /// Create an active campaign.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Validation` for an invalid code or a discount
    /// outside `1..=100`, `AdminError::AlreadyExists` if the code is taken.
    #[instrument(skip(self))]
    pub async fn create_campaign(
        &self,
        code: &str,
        discount_percent: u8,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Campaign, AdminError> {
        let session = self.require_admin()?;
        let code = CouponCode::parse(code)?;
        if !(1..=100).contains(&discount_percent) {
            return Err(AdminError::Validation(format!(
                "discount must be between 1 and 100 (got {discount_percent})"
            )));
        }
        add_breadcrumb("admin", "create_campaign", Some(&[("code", code.as_str())]));

        let rows = self
            .store
            .insert(
                Some(&session),
                Collection::Campaigns,
                json!({
                    "code": code,
                    "discount_percent": discount_percent,
                    "expires_at": expires_at,
                    "active": true,
                }),
            )
            .await
            .map_err(conflict(format!("campaign '{code}'")))?;

        let campaign: Campaign = single(rows, || format!("campaign '{code}'"))?;
        tracing::info!(campaign_id = %campaign.id, code = %campaign.code, "Campaign created");
        Ok(campaign)
    }

    /// Stop a campaign from being redeemed.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NotFound` if no campaign has this id.
    #[instrument(skip(self), fields(campaign_id = %id))]
    pub async fn deactivate_campaign(&self, id: &CampaignId) -> Result<Campaign, AdminError> {
        let session = self.require_admin()?;
        let rows = self
            .store
            .update(
                Some(&session),
                Collection::Campaigns,
                &Filter::new().eq("id", id),
                json!({ "active": false }),
            )
            .await
            .map_err(AdminError::Store)?;
        single(rows, || format!("campaign {id}"))
    }

    /// Delete a campaign.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Store` if the remote store rejects the delete.
    #[instrument(skip(self), fields(campaign_id = %id))]
    pub async fn delete_campaign(&self, id: &CampaignId) -> Result<(), AdminError> {
        let session = self.require_admin()?;
        self.store
            .delete(
                Some(&session),
                Collection::Campaigns,
                &Filter::new().eq("id", id),
            )
            .await
            .map_err(AdminError::Store)
    }
}

fn category_fields(name: &str) -> Result<(String, String), AdminError> {
    let name = name.trim();
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(AdminError::Validation(
            "category name must contain letters or digits".to_string(),
        ));
    }
    Ok((name.to_string(), slug))
}

/// The one row a write returned.
fn single<T: DeserializeOwned>(
    rows: Vec<Value>,
    what: impl FnOnce() -> String,
) -> Result<T, AdminError> {
    decode_rows(rows)
        .map_err(AdminError::Store)?
        .into_iter()
        .next()
        .ok_or_else(|| AdminError::NotFound(what()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::UserId;
    use chrono::Duration;
    use secrecy::SecretString;

    use super::*;
    use crate::session::Role;
    use crate::store::MemoryStore;

    fn admin(store: &MemoryStore, role: Role) -> CatalogAdmin<MemoryStore> {
        let sessions = SessionProvider::new(Some(Session::new(
            UserId::new("staff-1"),
            SecretString::from("token"),
            Utc::now() + Duration::hours(1),
            role,
        )));
        CatalogAdmin::new(store.clone(), sessions)
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("  Home & Garden "), "home-garden");
        assert_eq!(slugify("Çocuk Giyim"), "cocuk-giyim");
        assert_eq!(slugify("Ayakkabı"), "ayakkabi");
        assert_eq!(slugify("!!!"), "");
    }

    #[tokio::test]
    async fn test_create_category_and_conflict() {
        let store = MemoryStore::new();
        let admin = admin(&store, Role::Admin);

        let category = admin.create_category("Home & Garden").await.unwrap();
        assert_eq!(category.slug, "home-garden");

        let duplicate = admin.create_category("home garden").await;
        assert!(matches!(duplicate, Err(AdminError::AlreadyExists(_))));
        assert_eq!(store.rows(Collection::Categories).len(), 1);
    }

    #[tokio::test]
    async fn test_customer_is_refused() {
        let store = MemoryStore::new();
        let admin = admin(&store, Role::Customer);
        assert!(matches!(
            admin.create_category("Shoes").await,
            Err(AdminError::NotAdmin)
        ));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_session_is_refused() {
        let admin = CatalogAdmin::new(MemoryStore::new(), SessionProvider::default());
        assert!(matches!(
            admin.delete_campaign(&CampaignId::from(1)).await,
            Err(AdminError::NoSession)
        ));
    }

    #[tokio::test]
    async fn test_rename_missing_category() {
        let admin = admin(&MemoryStore::new(), Role::Admin);
        assert!(matches!(
            admin.rename_category(&CategoryId::from(42), "Bags").await,
            Err(AdminError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_campaign_lifecycle() {
        let store = MemoryStore::new();
        let admin = admin(&store, Role::Admin);

        let campaign = admin.create_campaign("spring-25", 25, None).await.unwrap();
        assert_eq!(campaign.code.as_str(), "SPRING-25");
        assert!(campaign.active);

        let paused = admin.deactivate_campaign(&campaign.id).await.unwrap();
        assert!(!paused.active);

        admin.delete_campaign(&campaign.id).await.unwrap();
        assert!(store.rows(Collection::Campaigns).is_empty());
    }

    #[tokio::test]
    async fn test_campaign_validation() {
        let admin = admin(&MemoryStore::new(), Role::Admin);
        assert!(matches!(
            admin.create_campaign("x", 10, None).await,
            Err(AdminError::Validation(_))
        ));
        assert!(matches!(
            admin.create_campaign("SUMMER", 0, None).await,
            Err(AdminError::Validation(_))
        ));
    }
}
