//! The user's cart.
//!
//! Same reconciliation as favorites (toggling adds one unit or removes the
//! line) plus quantity changes and totals.

use bazaar_core::{CartLine, CurrencyCode, Price, Product, ProductId, UserId};
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::{Result, SyncError, add_breadcrumb};
use crate::notify::{Notice, Notifier};
use crate::reconcile::{CollectionKind, Membership, Reconciler, Request};
use crate::session::Session;
use crate::store::{Collection, RemoteStore};

/// Largest quantity accepted for one line.
pub const MAX_QUANTITY: u32 = 99;

/// Marker for the `cart_items` collection.
#[derive(Debug, Clone, Copy)]
pub struct Cart;

impl CollectionKind for Cart {
    type Entry = CartLine;

    const COLLECTION: Collection = Collection::CartItems;
    const LABEL: &'static str = "cart";

    const ADDED: Notice = Notice::AddedToCart;
    const REMOVED: Notice = Notice::RemovedFromCart;
    const ALREADY_PRESENT: Notice = Notice::AlreadyInCart;

    fn product_id(entry: &CartLine) -> &ProductId {
        &entry.product_id
    }

    fn product(entry: &CartLine) -> Option<&Product> {
        entry.product.as_ref()
    }

    fn new_row(user_id: &UserId, product_id: &ProductId) -> Value {
        line_row(user_id, product_id, 1)
    }
}

fn line_row(user_id: &UserId, product_id: &ProductId, quantity: u32) -> Value {
    json!({ "user_id": user_id, "product_id": product_id, "quantity": quantity })
}

/// Cart mirror for one session.
pub type CartStore<S, N> = Reconciler<Cart, S, N>;

impl<S, N> Reconciler<Cart, S, N>
where
    S: RemoteStore,
    N: Notifier,
{
    /// Set the quantity of a line. `0` removes it, an absent product is
    /// added with `quantity` units.
    ///
    /// Returns whether the remote store confirmed the change.
    pub async fn set_quantity(&self, product_id: &ProductId, quantity: u32) -> bool {
        self.try_set_quantity(product_id, quantity).await.is_ok()
    }

    /// [`Self::set_quantity`] with the typed outcome.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::NoSession` without a session,
    /// `SyncError::InvalidQuantity` above [`MAX_QUANTITY`], or
    /// `SyncError::RemoteUnavailable` if the mutation failed.
    pub async fn try_set_quantity(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Membership> {
        let session = self.require_session()?;
        if quantity > MAX_QUANTITY {
            tracing::debug!(product_id = %product_id, quantity, "Rejected cart quantity");
            self.notify(Notice::InvalidQuantity);
            return Err(SyncError::InvalidQuantity(quantity));
        }

        let quantity_text = quantity.to_string();
        add_breadcrumb(
            Cart::LABEL,
            "set_quantity",
            Some(&[
                ("product_id", product_id.as_str()),
                ("quantity", quantity_text.as_str()),
            ]),
        );

        let session = &session;
        self.run_exclusive(session, product_id, Request::SetQuantity(quantity), move || {
            self.set_quantity_now(session, product_id, quantity)
        })
        .await
    }

    #[instrument(
        skip_all,
        fields(user_id = %session.user_id, product_id = %product_id, quantity = quantity)
    )]
    async fn set_quantity_now(
        &self,
        session: &Session,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Membership> {
        let filter = Self::row_filter(&session.user_id, product_id);
        let store = self.store();

        let membership = if quantity == 0 {
            store
                .delete(Some(session), Cart::COLLECTION, &filter)
                .await
                .map_err(|err| self.fail(&filter, err))?;
            Membership::Removed
        } else if self.quantity_of(product_id).is_some() {
            store
                .update(
                    Some(session),
                    Cart::COLLECTION,
                    &filter,
                    json!({ "quantity": quantity }),
                )
                .await
                .map_err(|err| self.fail(&filter, err))?;
            Membership::Updated
        } else {
            let row = line_row(&session.user_id, product_id, quantity);
            match store.insert(Some(session), Cart::COLLECTION, row).await {
                Ok(_) => Membership::Added,
                // Added elsewhere since the last fetch
                Err(err) if err.is_constraint_violation() => {
                    store
                        .update(
                            Some(session),
                            Cart::COLLECTION,
                            &filter,
                            json!({ "quantity": quantity }),
                        )
                        .await
                        .map_err(|err| self.fail(&filter, err))?;
                    Membership::Updated
                }
                Err(err) => return Err(self.fail(&filter, err)),
            }
        };

        self.confirm(session, membership).await;
        Ok(membership)
    }

    /// Units of `product_id` in the cart, if it has a line.
    pub fn quantity_of(&self, product_id: &ProductId) -> Option<u32> {
        self.visible()?
            .iter()
            .find(|line| &line.product_id == product_id)
            .map(|line| line.quantity)
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> u32 {
        self.visible()
            .map(|lines| lines.iter().map(|line| line.quantity).sum())
            .unwrap_or(0)
    }

    /// Sum of discounted unit price times quantity.
    ///
    /// Lines whose product did not join are skipped, and so are lines priced
    /// in a currency other than the first priced line's.
    pub fn subtotal(&self) -> Price {
        let lines = self.visible().unwrap_or_default();
        subtotal_of(&lines)
    }
}

fn subtotal_of(lines: &[CartLine]) -> Price {
    let mut priced = lines
        .iter()
        .filter_map(|line| line.product.as_ref().map(|p| p.sale_price().times(line.quantity)))
        .peekable();

    let currency = priced
        .peek()
        .map_or(CurrencyCode::default(), |price| price.currency_code);
    priced.fold(Price::zero(currency), |total, price| {
        if price.currency_code != currency {
            tracing::warn!(
                expected = ?currency,
                found = ?price.currency_code,
                "Skipping cart line in another currency"
            );
            return total;
        }
        Price::new(total.amount + price.amount, currency)
    })
}
