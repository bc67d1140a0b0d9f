//! Cart commands.

use bazaar_client::RemoteStore;
use bazaar_core::ProductId;

use super::{CliError, Context};

/// Print the cart with its subtotal.
///
/// # Errors
///
/// Returns `CliError::Sync` without a session.
#[allow(clippy::print_stdout)]
pub async fn list<S: RemoteStore>(ctx: &Context<S>) -> Result<(), CliError> {
    let session = ctx.signed_in()?;
    let cart = ctx.cart();
    cart.initialize(Some(&session)).await;

    let lines = cart.current_entries();
    if lines.is_empty() {
        println!("Your cart is empty.");
        return Ok(());
    }

    for line in &lines {
        match &line.product {
            Some(product) => println!(
                "{:>3} x {:<40} {:>12}",
                line.quantity,
                product.name,
                product.sale_price().times(line.quantity).to_string(),
            ),
            None => println!(
                "{:>3} x {:<40} {:>12}",
                line.quantity,
                line.product_id.as_str(),
                "unavailable"
            ),
        }
    }
    println!("{} items, subtotal {}", cart.item_count(), cart.subtotal());
    Ok(())
}

/// Add one unit of a product, or remove its line.
///
/// # Errors
///
/// Returns `CliError::Sync` without a session or if the remote store
/// rejected the change.
#[allow(clippy::print_stdout)]
pub async fn toggle<S: RemoteStore>(ctx: &Context<S>, product_id: &ProductId) -> Result<(), CliError> {
    let session = ctx.signed_in()?;
    let cart = ctx.cart();
    cart.initialize(Some(&session)).await;

    cart.try_toggle(product_id).await?;
    println!("{} items, subtotal {}", cart.item_count(), cart.subtotal());
    Ok(())
}

/// Set the quantity of one product.
///
/// # Errors
///
/// Returns `CliError::Sync` without a session, for an invalid quantity, or
/// if the remote store rejected the change.
#[allow(clippy::print_stdout)]
pub async fn set<S: RemoteStore>(
    ctx: &Context<S>,
    product_id: &ProductId,
    quantity: u32,
) -> Result<(), CliError> {
    let session = ctx.signed_in()?;
    let cart = ctx.cart();
    cart.initialize(Some(&session)).await;

    cart.try_set_quantity(product_id, quantity).await?;
    println!("{} items, subtotal {}", cart.item_count(), cart.subtotal());
    Ok(())
}
