//! Bazaar CLI - Browse the catalog and manage favorites and the cart.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! bazaar products page --limit 12
//! bazaar products best-sellers
//! bazaar products show 42
//!
//! # Favorites and cart (needs BAZAAR_USER_ID and BAZAAR_ACCESS_TOKEN)
//! bazaar favorites toggle 42
//! bazaar cart set 42 3
//! bazaar cart list
//!
//! # Catalog administration (needs BAZAAR_USER_ROLE=admin)
//! bazaar admin create-campaign SPRING-25 --discount 25 --expires-in-days 30
//!
//! # Any of the above against an in-memory store with sample data
//! bazaar --demo favorites toggle 3
//! ```
//!
//! # Commands
//!
//! - `products` - Product grid pages, shelves and single products
//! - `categories` / `campaigns` - Taxonomy and redeemable coupons
//! - `favorites` / `cart` - The signed-in user's collections
//! - `admin` - Category and campaign management

#![cfg_attr(not(test), forbid(unsafe_code))]

use bazaar_client::{
    CacheConfig, ClientConfig, Locale, MemoryStore, RecordingNotifier, RemoteStore, RestStore,
    SessionProvider,
};
use bazaar_core::{CampaignId, CategoryId, ProductId};
use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{CliError, Context};

#[derive(Parser)]
#[command(name = "bazaar")]
#[command(author, version, about = "Bazaar marketplace client")]
struct Cli {
    /// Use an in-memory store with sample data instead of the remote store
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse products
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// List categories
    Categories,
    /// List campaigns that can be redeemed now
    Campaigns,
    /// Manage favorites
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage categories and campaigns
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// One page of the product grid, newest first
    Page {
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Page size (defaults to `BAZAAR_PAGE_SIZE`)
        #[arg(long)]
        limit: Option<usize>,

        /// Restrict to a category id
        #[arg(long)]
        category: Option<String>,
    },
    /// Best-selling products
    BestSellers {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Recently listed products
    NewArrivals {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Show one product
    Show { id: String },
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// List favorite products
    List,
    /// Add a product to favorites, or remove it if already there
    Toggle { product_id: String },
}

#[derive(Subcommand)]
enum CartAction {
    /// List cart lines with the subtotal
    List,
    /// Add one unit of a product, or remove its line if already there
    Toggle { product_id: String },
    /// Set the quantity of a product (0 removes the line)
    Set { product_id: String, quantity: u32 },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a category
    CreateCategory { name: String },
    /// Rename a category
    RenameCategory { id: String, name: String },
    /// Delete a category
    DeleteCategory { id: String },
    /// Create a coupon campaign
    CreateCampaign {
        code: String,

        /// Discount in percent (1-100)
        #[arg(short, long)]
        discount: u8,

        /// Expire the campaign after this many days
        #[arg(long)]
        expires_in_days: Option<i64>,
    },
    /// Stop a campaign from being redeemed
    DeactivateCampaign { id: String },
    /// Delete a campaign
    DeleteCampaign { id: String },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Demo mode runs without a remote store, so configuration is optional there
    let config = if cli.demo {
        None
    } else {
        match ClientConfig::from_env() {
            Ok(config) => Some(config),
            Err(e) => {
                tracing_subscriber::fmt::init();
                tracing::error!("Failed to load configuration: {e}");
                std::process::exit(2);
            }
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = config.as_ref().and_then(init_sentry);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bazaar_client=info,bazaar_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Some(config) => run_remote(&config, cli.command).await,
        None => run_demo(cli.command).await,
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run_remote(config: &ClientConfig, command: Commands) -> Result<(), CliError> {
    let store = RestStore::new(config)?;
    let sessions = SessionProvider::new(commands::session::from_env()?);
    let ctx = Context {
        store,
        sessions,
        notifier: RecordingNotifier::new(),
        locale: config.locale,
        cache: config.cache,
        page_size: config.page_size,
    };
    run(&ctx, command).await
}

async fn run_demo(command: Commands) -> Result<(), CliError> {
    let store = MemoryStore::new();
    commands::demo::seed(&store);

    let session = match commands::session::from_env()? {
        Some(session) => session,
        None => commands::demo::session(),
    };
    let locale = std::env::var("BAZAAR_LOCALE")
        .ok()
        .and_then(|value| value.parse::<Locale>().ok())
        .unwrap_or_default();

    let ctx = Context {
        store,
        sessions: SessionProvider::new(Some(session)),
        notifier: RecordingNotifier::new(),
        locale,
        cache: CacheConfig::default(),
        page_size: commands::demo::PAGE_SIZE,
    };
    run(&ctx, command).await
}

async fn run<S: RemoteStore>(ctx: &Context<S>, command: Commands) -> Result<(), CliError> {
    let result = match command {
        Commands::Products { action } => match action {
            ProductsAction::Page {
                offset,
                limit,
                category,
            } => {
                let category = category.map(CategoryId::new);
                commands::catalog::page(ctx, offset, limit, category).await
            }
            ProductsAction::BestSellers { limit } => {
                commands::catalog::best_sellers(ctx, limit).await
            }
            ProductsAction::NewArrivals { limit } => {
                commands::catalog::new_arrivals(ctx, limit).await
            }
            ProductsAction::Show { id } => commands::catalog::show(ctx, &ProductId::new(id)).await,
        },
        Commands::Categories => commands::catalog::categories(ctx).await,
        Commands::Campaigns => commands::catalog::campaigns(ctx).await,
        Commands::Favorites { action } => match action {
            FavoritesAction::List => commands::favorites::list(ctx).await,
            FavoritesAction::Toggle { product_id } => {
                commands::favorites::toggle(ctx, &ProductId::new(product_id)).await
            }
        },
        Commands::Cart { action } => match action {
            CartAction::List => commands::cart::list(ctx).await,
            CartAction::Toggle { product_id } => {
                commands::cart::toggle(ctx, &ProductId::new(product_id)).await
            }
            CartAction::Set {
                product_id,
                quantity,
            } => commands::cart::set(ctx, &ProductId::new(product_id), quantity).await,
        },
        Commands::Admin { action } => match action {
            AdminAction::CreateCategory { name } => {
                commands::admin::create_category(ctx, &name).await
            }
            AdminAction::RenameCategory { id, name } => {
                commands::admin::rename_category(ctx, &CategoryId::new(id), &name).await
            }
            AdminAction::DeleteCategory { id } => {
                commands::admin::delete_category(ctx, &CategoryId::new(id)).await
            }
            AdminAction::CreateCampaign {
                code,
                discount,
                expires_in_days,
            } => commands::admin::create_campaign(ctx, &code, discount, expires_in_days).await,
            AdminAction::DeactivateCampaign { id } => {
                commands::admin::deactivate_campaign(ctx, &CampaignId::new(id)).await
            }
            AdminAction::DeleteCampaign { id } => {
                commands::admin::delete_campaign(ctx, &CampaignId::new(id)).await
            }
        },
    };

    // Notices are shown whether or not the command succeeded
    ctx.flush_notices();
    result
}
