//! Integration tests for catalog reads and catalog administration.
//!
//! Run with: cargo test -p bazaar-integration-tests

#![allow(clippy::unwrap_used)]

use bazaar_client::{AdminError, CacheConfig, Catalog, CatalogAdmin, MemoryStore, PageRequest};
use bazaar_core::ProductId;
use bazaar_integration_tests::{Harness, PRODUCT_COUNT, admin_session, session};
use chrono::{Duration, Utc};

fn catalog(h: &Harness) -> Catalog<MemoryStore> {
    Catalog::new(h.store.clone(), &CacheConfig::default())
}

fn admin(h: &Harness) -> CatalogAdmin<MemoryStore> {
    CatalogAdmin::new(h.store.clone(), h.sessions.clone()).with_catalog(catalog(h))
}

// ============================================================================
// Product Grid
// ============================================================================

#[tokio::test]
async fn test_paging_walks_whole_catalog_newest_first() {
    let h = Harness::new();
    let catalog = catalog(&h);

    let mut request = Some(PageRequest::first(4));
    let mut seen = Vec::new();
    let mut pages = 0;
    while let Some(current) = request {
        let page = catalog.page(&current).await.unwrap();
        seen.extend(page.items.iter().map(|p| p.id.clone()));
        request = current.next(&page);
        pages += 1;
    }

    assert_eq!(pages, 3);
    let expected: Vec<ProductId> = (1..=PRODUCT_COUNT).map(ProductId::from).collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_best_sellers_rank_by_sales() {
    let h = Harness::new();
    let catalog = catalog(&h);

    let top = catalog.best_sellers(3).await.unwrap();

    let ids: Vec<ProductId> = top.into_iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![ProductId::from(10), ProductId::from(9), ProductId::from(8)]);
}

#[tokio::test]
async fn test_new_arrivals_prefer_recent_products() {
    let h = Harness::new();
    let catalog = catalog(&h);

    let fresh = catalog.new_arrivals(1).await.unwrap();

    assert_eq!(fresh.len(), 1);
    assert!(fresh[0].created_at > Utc::now() - Duration::days(PRODUCT_COUNT));
}

// ============================================================================
// Administration
// ============================================================================

#[tokio::test]
async fn test_customers_cannot_manage_catalog() {
    let h = Harness::new();
    h.sessions.sign_in(session("u1"));

    let result = admin(&h).create_category("Lamps").await;

    assert!(matches!(result, Err(AdminError::NotAdmin)));
}

#[tokio::test]
async fn test_admin_requires_session() {
    let h = Harness::new();

    let result = admin(&h).create_category("Lamps").await;

    assert!(matches!(result, Err(AdminError::NoSession)));
}

#[tokio::test]
async fn test_new_category_is_visible_through_shared_catalog() {
    let h = Harness::new();
    h.sessions.sign_in(admin_session("root"));
    let catalog = catalog(&h);
    let admin = CatalogAdmin::new(h.store.clone(), h.sessions.clone()).with_catalog(catalog.clone());

    assert!(catalog.categories().await.unwrap().is_empty());

    let created = admin.create_category("Garden Tools").await.unwrap();
    assert_eq!(created.slug, "garden-tools");

    let categories = catalog.categories().await.unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].name, "Garden Tools");

    let duplicate = admin.create_category("Garden tools").await;
    assert!(matches!(duplicate, Err(AdminError::AlreadyExists(_))));
}

#[tokio::test]
async fn test_deactivated_campaign_is_not_redeemable() {
    let h = Harness::new();
    h.sessions.sign_in(admin_session("root"));
    let admin = admin(&h);
    let catalog = catalog(&h);

    let spring = admin
        .create_campaign("SPRING-25", 25, Some(Utc::now() + Duration::days(30)))
        .await
        .unwrap();
    admin.create_campaign("WELCOME10", 10, None).await.unwrap();

    let active = catalog.active_campaigns(Utc::now()).await.unwrap();
    assert_eq!(active.len(), 2);

    admin.deactivate_campaign(&spring.id).await.unwrap();

    let active = catalog.active_campaigns(Utc::now()).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].code.as_str(), "WELCOME10");
}

#[tokio::test]
async fn test_campaign_discount_is_validated() {
    let h = Harness::new();
    h.sessions.sign_in(admin_session("root"));

    let result = admin(&h).create_campaign("ZERO", 0, None).await;

    assert!(matches!(result, Err(AdminError::Validation(_))));
}
