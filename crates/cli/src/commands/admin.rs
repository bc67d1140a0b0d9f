//! Catalog administration commands.
//!
//! Requires `BAZAAR_USER_ROLE=admin` (or `--demo`).

use bazaar_client::RemoteStore;
use bazaar_core::{CampaignId, CategoryId};
use chrono::{Duration, Utc};

use super::{CliError, Context};

/// # Errors
///
/// Returns `CliError::Admin` if the caller is not an admin, the name is
/// invalid, or the slug is taken.
#[allow(clippy::print_stdout)]
pub async fn create_category<S: RemoteStore>(ctx: &Context<S>, name: &str) -> Result<(), CliError> {
    let category = ctx.admin().create_category(name).await?;
    println!("Created category {} ({})", category.id, category.slug);
    Ok(())
}

/// # Errors
///
/// Returns `CliError::Admin` if the caller is not an admin or the category
/// does not exist.
#[allow(clippy::print_stdout)]
pub async fn rename_category<S: RemoteStore>(
    ctx: &Context<S>,
    id: &CategoryId,
    name: &str,
) -> Result<(), CliError> {
    let category = ctx.admin().rename_category(id, name).await?;
    println!("Renamed category {} to {} ({})", category.id, category.name, category.slug);
    Ok(())
}

/// # Errors
///
/// Returns `CliError::Admin` if the caller is not an admin.
#[allow(clippy::print_stdout)]
pub async fn delete_category<S: RemoteStore>(
    ctx: &Context<S>,
    id: &CategoryId,
) -> Result<(), CliError> {
    ctx.admin().delete_category(id).await?;
    println!("Deleted category {id}");
    Ok(())
}

/// # Errors
///
/// Returns `CliError::InvalidArgument` for a non-positive expiry, or
/// `CliError::Admin` if the caller is not an admin, the code or discount is
/// invalid, or the code is taken.
#[allow(clippy::print_stdout)]
pub async fn create_campaign<S: RemoteStore>(
    ctx: &Context<S>,
    code: &str,
    discount: u8,
    expires_in_days: Option<i64>,
) -> Result<(), CliError> {
    let expires_at = match expires_in_days {
        Some(days) if days <= 0 => {
            return Err(CliError::InvalidArgument(
                "--expires-in-days must be positive".to_string(),
            ));
        }
        Some(days) => Some(Utc::now() + Duration::days(days)),
        None => None,
    };

    let campaign = ctx
        .admin()
        .create_campaign(code, discount, expires_at)
        .await?;
    println!(
        "Created campaign {} ({}, -{}%)",
        campaign.id, campaign.code, campaign.discount_percent
    );
    Ok(())
}

/// # Errors
///
/// Returns `CliError::Admin` if the caller is not an admin or the campaign
/// does not exist.
#[allow(clippy::print_stdout)]
pub async fn deactivate_campaign<S: RemoteStore>(
    ctx: &Context<S>,
    id: &CampaignId,
) -> Result<(), CliError> {
    let campaign = ctx.admin().deactivate_campaign(id).await?;
    println!("Deactivated campaign {}", campaign.code);
    Ok(())
}

/// # Errors
///
/// Returns `CliError::Admin` if the caller is not an admin.
#[allow(clippy::print_stdout)]
pub async fn delete_campaign<S: RemoteStore>(
    ctx: &Context<S>,
    id: &CampaignId,
) -> Result<(), CliError> {
    ctx.admin().delete_campaign(id).await?;
    println!("Deleted campaign {id}");
    Ok(())
}
