//! Subcommand implementations.

pub mod demo;
pub mod migrate;
pub mod order;
pub mod seed;

use stitchworks_orders::db::{self, PgDatabase};
use stitchworks_orders::services::ConfiguredNotifier;
use stitchworks_orders::{OrderService, OrdersConfig};

/// Result type shared by every subcommand.
pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// The order core as the CLI runs it against `PostgreSQL`.
pub type PgOrderService = OrderService<PgDatabase, ConfiguredNotifier>;

/// Load configuration and connect to the orders database.
///
/// # Errors
///
/// Returns an error if configuration is missing or the database is unreachable.
pub async fn connect() -> Result<(OrdersConfig, PgDatabase), Box<dyn std::error::Error>> {
    let config = OrdersConfig::from_env()?;

    tracing::info!("Connecting to orders database...");
    let pool = db::create_pool(&config.database_url, config.max_connections).await?;
    let database = PgDatabase::new(pool, config.settings.lock_timeout);
    Ok((config, database))
}

/// Connect and assemble the order service with the configured notifier.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the database is unreachable,
/// or the SMTP relay cannot be configured.
pub async fn service() -> Result<PgOrderService, Box<dyn std::error::Error>> {
    let (config, database) = connect().await?;
    let notifier = ConfiguredNotifier::from_config(config.email.as_ref())?;
    Ok(OrderService::new(database, notifier, &config.settings))
}

/// Print a value as pretty JSON on stdout.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    let rendered = serde_json::to_string_pretty(value)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{rendered}");
    }
    Ok(())
}
