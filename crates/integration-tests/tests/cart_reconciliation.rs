//! Integration tests for the cart mirror.
//!
//! Run with: cargo test -p bazaar-integration-tests

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::Duration;

use bazaar_client::store::{Collection, StoreOp};
use bazaar_client::{MAX_QUANTITY, MemoryStore, Membership, Notice, SyncError};
use bazaar_core::ProductId;
use bazaar_integration_tests::{Harness, remote_product_ids, session};

fn pid(id: i64) -> ProductId {
    ProductId::from(id)
}

/// Quantity stored remotely for one of `user`'s lines.
fn remote_quantity(store: &MemoryStore, user: &str, product: i64) -> Option<u64> {
    store
        .rows(Collection::CartItems)
        .into_iter()
        .find(|row| {
            row["user_id"].as_str() == Some(user)
                && (row["product_id"].as_i64() == Some(product)
                    || row["product_id"].as_str() == Some(product.to_string().as_str()))
        })
        .and_then(|row| row["quantity"].as_u64())
}

// ============================================================================
// Quantities
// ============================================================================

#[tokio::test]
async fn test_set_quantity_adds_missing_line() {
    let h = Harness::signed_in("u1");
    let cart = h.cart();
    cart.initialize(h.sessions.current().as_ref()).await;

    let outcome = cart.try_set_quantity(&pid(2), 3).await.unwrap();

    assert_eq!(outcome, Membership::Added);
    assert_eq!(cart.quantity_of(&pid(2)), Some(3));
    assert_eq!(remote_quantity(&h.store, "u1", 2), Some(3));
    assert_eq!(h.notifier.notices(), vec![Notice::AddedToCart]);
}

#[tokio::test]
async fn test_set_quantity_updates_existing_line() {
    let h = Harness::signed_in("u1");
    h.seed_cart("u1", &[(2, 1)]);
    let cart = h.cart();
    cart.initialize(h.sessions.current().as_ref()).await;
    h.store.clear_calls();

    assert!(cart.set_quantity(&pid(2), 4).await);

    assert_eq!(cart.quantity_of(&pid(2)), Some(4));
    assert_eq!(remote_quantity(&h.store, "u1", 2), Some(4));
    assert_eq!(h.store.call_count(StoreOp::Update, Collection::CartItems), 1);
    assert_eq!(h.store.call_count(StoreOp::Insert, Collection::CartItems), 0);
    assert_eq!(h.notifier.notices(), vec![Notice::CartQuantityUpdated]);
}

#[tokio::test]
async fn test_zero_quantity_removes_line() {
    let h = Harness::signed_in("u1");
    h.seed_cart("u1", &[(2, 2), (3, 1)]);
    let cart = h.cart();
    cart.initialize(h.sessions.current().as_ref()).await;

    assert!(cart.set_quantity(&pid(2), 0).await);

    assert_eq!(cart.quantity_of(&pid(2)), None);
    assert_eq!(cart.member_ids(), vec![pid(3)]);
    assert_eq!(
        remote_product_ids(&h.store, Collection::CartItems, "u1"),
        vec!["3"]
    );
    assert_eq!(h.notifier.notices(), vec![Notice::RemovedFromCart]);
}

#[tokio::test]
async fn test_quantity_above_limit_is_rejected_locally() {
    let h = Harness::signed_in("u1");
    let cart = h.cart();
    cart.initialize(h.sessions.current().as_ref()).await;
    h.store.clear_calls();

    let result = cart.try_set_quantity(&pid(2), MAX_QUANTITY + 1).await;

    assert!(matches!(result, Err(SyncError::InvalidQuantity(q)) if q == MAX_QUANTITY + 1));
    assert!(h.store.calls().is_empty());
    assert_eq!(h.notifier.notices(), vec![Notice::InvalidQuantity]);
}

#[tokio::test]
async fn test_line_added_elsewhere_is_updated_instead() {
    let h = Harness::signed_in("u1");
    let cart = h.cart();
    cart.initialize(h.sessions.current().as_ref()).await;

    // Another device added the line after our last fetch
    h.seed_cart("u1", &[(4, 1)]);

    let outcome = cart.try_set_quantity(&pid(4), 2).await.unwrap();

    assert_eq!(outcome, Membership::Updated);
    assert_eq!(cart.quantity_of(&pid(4)), Some(2));
    assert_eq!(
        remote_product_ids(&h.store, Collection::CartItems, "u1"),
        vec!["4"]
    );
}

#[tokio::test]
async fn test_set_quantity_without_session() {
    let h = Harness::new();
    let cart = h.cart();

    assert!(!cart.set_quantity(&pid(2), 1).await);

    assert!(h.store.calls().is_empty());
    assert_eq!(h.notifier.notices(), vec![Notice::SignInRequired]);
}

// ============================================================================
// Toggle
// ============================================================================

#[tokio::test]
async fn test_toggle_adds_one_unit_then_removes_line() {
    let h = Harness::signed_in("u1");
    let cart = h.cart();
    cart.initialize(h.sessions.current().as_ref()).await;

    assert!(cart.toggle(&pid(6)).await);
    assert_eq!(cart.quantity_of(&pid(6)), Some(1));

    assert!(cart.toggle(&pid(6)).await);
    assert_eq!(cart.quantity_of(&pid(6)), None);
    assert_eq!(
        h.notifier.notices(),
        vec![Notice::AddedToCart, Notice::RemovedFromCart]
    );
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn test_identical_quantity_changes_coalesce() {
    let h = Harness::with_latency(Duration::from_millis(20));
    h.sessions.sign_in(session("u1"));
    let cart = h.cart();
    cart.initialize(h.sessions.current().as_ref()).await;
    h.store.clear_calls();

    let product = pid(2);
    let (a, b) = tokio::join!(cart.set_quantity(&product, 3), cart.set_quantity(&product, 3));

    assert!(a && b);
    assert_eq!(h.store.call_count(StoreOp::Insert, Collection::CartItems), 1);
    assert_eq!(remote_quantity(&h.store, "u1", 2), Some(3));
}

#[tokio::test]
async fn test_different_quantity_changes_run_in_order() {
    let h = Harness::with_latency(Duration::from_millis(20));
    h.sessions.sign_in(session("u1"));
    let cart = h.cart();
    cart.initialize(h.sessions.current().as_ref()).await;
    h.store.clear_calls();

    let product = pid(2);
    let (first, second) = tokio::join!(
        cart.try_set_quantity(&product, 2),
        cart.try_set_quantity(&product, 5)
    );

    assert_eq!(first.unwrap(), Membership::Added);
    assert_eq!(second.unwrap(), Membership::Updated);
    assert_eq!(h.store.call_count(StoreOp::Insert, Collection::CartItems), 1);
    assert_eq!(cart.quantity_of(&pid(2)), Some(5));
    assert_eq!(remote_quantity(&h.store, "u1", 2), Some(5));
}

// ============================================================================
// Totals
// ============================================================================

#[tokio::test]
async fn test_item_count_and_subtotal() {
    let h = Harness::signed_in("u1");
    // Product n costs n * 100
    h.seed_cart("u1", &[(2, 3), (5, 1)]);
    let cart = h.cart();
    cart.initialize(h.sessions.current().as_ref()).await;

    assert_eq!(cart.item_count(), 4);
    assert!(cart.subtotal().to_string().ends_with("1100.00"));
}

#[tokio::test]
async fn test_totals_are_zero_after_sign_out() {
    let h = Harness::signed_in("u1");
    h.seed_cart("u1", &[(2, 3)]);
    let cart = h.cart();
    cart.initialize(h.sessions.current().as_ref()).await;

    h.sessions.sign_out();

    assert_eq!(cart.item_count(), 0);
    assert!(cart.subtotal().amount.is_zero());
}
