//! Catalog commands.

use bazaar_client::{PageRequest, RemoteStore};
use bazaar_core::{CategoryId, ProductId};
use chrono::Utc;

use super::{CliError, Context, product_row};

/// Print one page of the product grid.
///
/// # Errors
///
/// Returns `CliError::InvalidArgument` for a zero limit, or
/// `CliError::Catalog` if the read fails.
#[allow(clippy::print_stdout)]
pub async fn page<S: RemoteStore>(
    ctx: &Context<S>,
    offset: usize,
    limit: Option<usize>,
    category: Option<CategoryId>,
) -> Result<(), CliError> {
    let limit = limit.unwrap_or(ctx.page_size);
    if limit == 0 {
        return Err(CliError::InvalidArgument("limit must be positive".to_string()));
    }

    let mut request = PageRequest::first(limit);
    request.offset = offset;
    if let Some(category) = category {
        request = request.in_category(category);
    }

    let page = ctx.catalog().page(&request).await?;
    for product in &page.items {
        println!("{}", product_row(product));
    }
    match request.next(&page) {
        Some(next) => println!("-- more: --offset {}", next.offset),
        None => println!("-- end of catalog"),
    }
    Ok(())
}

/// Print the best-selling shelf.
///
/// # Errors
///
/// Returns `CliError::Catalog` if the read fails.
#[allow(clippy::print_stdout)]
pub async fn best_sellers<S: RemoteStore>(ctx: &Context<S>, limit: usize) -> Result<(), CliError> {
    for product in ctx.catalog().best_sellers(limit).await? {
        println!("{}", product_row(&product));
    }
    Ok(())
}

/// Print the new-arrivals shelf.
///
/// # Errors
///
/// Returns `CliError::Catalog` if the read fails.
#[allow(clippy::print_stdout)]
pub async fn new_arrivals<S: RemoteStore>(ctx: &Context<S>, limit: usize) -> Result<(), CliError> {
    for product in ctx.catalog().new_arrivals(limit).await? {
        println!("{}", product_row(&product));
    }
    Ok(())
}

/// Print one product in detail.
///
/// # Errors
///
/// Returns `CliError::Catalog` if the product does not exist or the read
/// fails.
#[allow(clippy::print_stdout)]
pub async fn show<S: RemoteStore>(ctx: &Context<S>, id: &ProductId) -> Result<(), CliError> {
    let product = ctx.catalog().product(id).await?;

    println!("{}", product.name);
    if let Some(description) = &product.description {
        println!("{description}");
    }
    println!("Price:  {} (list {})", product.sale_price(), product.list_price());
    if let Some(seller) = &product.seller {
        println!("Seller: {}", seller.name.as_deref().unwrap_or(seller.id.as_str()));
    }
    println!("Rating: {:.1} ({} ratings)", product.rating, product.rating_count);
    println!("Stock:  {}", product.stock);
    Ok(())
}

/// Print all categories.
///
/// # Errors
///
/// Returns `CliError::Catalog` if the read fails.
#[allow(clippy::print_stdout)]
pub async fn categories<S: RemoteStore>(ctx: &Context<S>) -> Result<(), CliError> {
    for category in ctx.catalog().categories().await? {
        println!("{:>6}  {:<24} /{}", category.id.as_str(), category.name, category.slug);
    }
    Ok(())
}

/// Print campaigns that can be redeemed now.
///
/// # Errors
///
/// Returns `CliError::Catalog` if the read fails.
#[allow(clippy::print_stdout)]
pub async fn campaigns<S: RemoteStore>(ctx: &Context<S>) -> Result<(), CliError> {
    for campaign in ctx.catalog().active_campaigns(Utc::now()).await? {
        let expiry = campaign
            .expires_at
            .map(|at| format!("until {}", at.format("%Y-%m-%d %H:%M")))
            .unwrap_or_default();
        println!(
            "{:<16} -{:>3}%  {expiry}",
            campaign.code.as_str(),
            campaign.discount_percent
        );
    }
    Ok(())
}
