//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! sw-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `ORDERS_DATABASE_URL` - `PostgreSQL` connection string
//!
//! Migrations live in `crates/orders/migrations/` and are embedded in the
//! binary at build time.

use stitchworks_orders::db::MIGRATOR;

use super::{CliResult, connect};

/// Run every pending orders migration.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> CliResult {
    let (_, database) = connect().await?;

    tracing::info!("Running orders migrations...");
    MIGRATOR.run(database.pool()).await?;

    tracing::info!("Orders migrations complete!");
    Ok(())
}
