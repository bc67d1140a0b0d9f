//! Favorites commands.

use bazaar_client::{Membership, RemoteStore};
use bazaar_core::ProductId;

use super::{CliError, Context, product_row};

/// Print the signed-in user's favorites.
///
/// # Errors
///
/// Returns `CliError::Sync` without a session.
#[allow(clippy::print_stdout)]
pub async fn list<S: RemoteStore>(ctx: &Context<S>) -> Result<(), CliError> {
    let session = ctx.signed_in()?;
    let favorites = ctx.favorites();
    favorites.initialize(Some(&session)).await;

    let entries = favorites.current_entries();
    if entries.is_empty() {
        println!("No favorites yet.");
        return Ok(());
    }
    for entry in entries {
        match &entry.product {
            Some(product) => println!("{}", product_row(product)),
            None => println!("{:>8}  (product no longer available)", entry.product_id.as_str()),
        }
    }
    Ok(())
}

/// Toggle one product.
///
/// # Errors
///
/// Returns `CliError::Sync` without a session or if the remote store
/// rejected the change.
#[allow(clippy::print_stdout)]
pub async fn toggle<S: RemoteStore>(ctx: &Context<S>, product_id: &ProductId) -> Result<(), CliError> {
    let session = ctx.signed_in()?;
    let favorites = ctx.favorites();
    favorites.initialize(Some(&session)).await;

    let membership = favorites.try_toggle(product_id).await?;
    let heart = match membership {
        Membership::Removed => "♡",
        Membership::Added | Membership::AlreadyPresent | Membership::Updated => "♥",
    };
    println!("{heart} {product_id} ({} favorites)", favorites.member_ids().len());
    Ok(())
}
