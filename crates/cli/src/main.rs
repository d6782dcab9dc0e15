//! Stitchworks CLI - Migrations, catalog seeding and order operations.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! sw-cli migrate
//!
//! # Load a catalog
//! sw-cli seed crates/cli/seed/catalog.yaml
//!
//! # Place an order: variant 1 with design 1, two units, printed front and back
//! sw-cli order create --customer 2 --item 1:1:2:front,back
//!
//! # Move it along
//! sw-cli order pay 1
//! sw-cli order ship 1
//!
//! # Cancel as the owning customer
//! sw-cli order cancel 2 --as 2
//!
//! # Run the whole flow in memory, no database needed
//! sw-cli demo
//! ```
//!
//! # Environment Variables
//!
//! - `ORDERS_DATABASE_URL` - `PostgreSQL` connection string (all commands but `demo`)
//! - `RUST_LOG` - Log filter (default: `stitchworks_orders=info,stitchworks_cli=info`)
//! - `SW_LOG_FORMAT` - Set to `json` for one JSON object per log line

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use stitchworks_core::{CustomerId, OrderId, OrderStatus};
use stitchworks_orders::models::CartItem;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

const DEFAULT_LOG_FILTER: &str = "stitchworks_orders=info,stitchworks_cli=info";

#[derive(Parser)]
#[command(name = "sw-cli")]
#[command(author, version, about = "Stitchworks operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Load sizes, colors, customers, products and designs from a YAML file
    Seed {
        /// Path to the catalog file
        file: String,
    },
    /// Create and manage orders
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Show revenue and best sellers
    Stats,
    /// Run the order flows against an in-memory store
    Demo,
}

#[derive(Subcommand)]
enum OrderAction {
    /// Create an order from one or more cart lines
    Create {
        /// Ordering customer ID
        #[arg(short, long)]
        customer: i32,

        /// Cart line as `<variant>:<design>:<qty>[:public][:loc1,loc2]`
        #[arg(short, long = "item", required = true, value_parser = commands::order::parse_item)]
        items: Vec<CartItem>,
    },
    /// Mark a pending order as paid
    Pay { id: i32 },
    /// Mark a paid order as shipped
    Ship { id: i32 },
    /// Cancel a pending order and restore its stock
    Cancel {
        id: i32,

        /// Acting customer ID
        #[arg(long = "as")]
        actor: i32,

        /// Act with admin rights
        #[arg(long)]
        admin: bool,
    },
    /// Show one order with its items
    Show { id: i32 },
    /// List orders, newest first
    List {
        /// Only orders of this customer
        #[arg(short, long)]
        customer: Option<i32>,
    },
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let json = std::env::var("SW_LOG_FORMAT").is_ok_and(|format| format == "json");
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

async fn run(cli: Cli) -> commands::CliResult {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::from_file(&file).await?,
        Commands::Order { action } => match action {
            OrderAction::Create { customer, items } => {
                commands::order::create(CustomerId::new(customer), items).await?;
            }
            OrderAction::Pay { id } => {
                commands::order::transition(OrderId::new(id), OrderStatus::Paid).await?;
            }
            OrderAction::Ship { id } => {
                commands::order::transition(OrderId::new(id), OrderStatus::Shipped).await?;
            }
            OrderAction::Cancel { id, actor, admin } => {
                commands::order::cancel(OrderId::new(id), CustomerId::new(actor), admin).await?;
            }
            OrderAction::Show { id } => commands::order::show(OrderId::new(id)).await?,
            OrderAction::List { customer } => {
                commands::order::list(customer.map(CustomerId::new)).await?;
            }
        },
        Commands::Stats => commands::order::stats().await?,
        Commands::Demo => commands::demo::run().await?,
    }
    Ok(())
}
