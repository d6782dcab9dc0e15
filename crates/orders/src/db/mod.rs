//! Persistence for the order core.
//!
//! # Backends
//!
//! - [`postgres::PgDatabase`] - `PostgreSQL` via `sqlx`, row locks with
//!   `SELECT ... FOR UPDATE` and a per-transaction `lock_timeout`
//! - [`memory::MemoryDatabase`] - in-process tables with per-row async
//!   mutexes, used by tests and the CLI demo
//!
//! # Transactions
//!
//! Every mutation goes through a [`StoreTx`] obtained from
//! [`Database::begin`]. Row locks taken through the transaction are held
//! until it ends. Dropping a transaction without [`StoreTx::commit`] discards
//! all of its writes.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/orders/migrations/` and run via:
//! ```bash
//! cargo run -p stitchworks-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use stitchworks_core::{
    CustomerId, DesignId, Email, Money, OrderId, OrderStatus, ProductId, Role, VariantId,
};
use thiserror::Error;

use crate::models::{Customer, Design, NewOrder, Order, Product, SalesSummary, VariantSnapshot};

pub use memory::{MemoryDatabase, MemoryTx};
pub use postgres::{PgDatabase, PgTx};

/// Embedded migrations for the orders database.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., negative stock, duplicate email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A row lock could not be acquired within the configured bound.
    #[error("timed out waiting for a row lock")]
    LockTimeout,
}

/// SQLSTATE codes that mean "gave up waiting on another transaction".
const LOCK_TIMEOUT_CODES: [&str; 3] = [
    "55P03", // lock_not_available
    "40P01", // deadlock_detected
    "57014", // query_canceled
];

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err
                .code()
                .is_some_and(|code| LOCK_TIMEOUT_CODES.contains(&&*code))
            {
                return Self::LockTimeout;
            }
            if db_err.is_unique_violation() || db_err.is_check_violation() {
                return Self::Conflict(db_err.message().to_string());
            }
        }
        if matches!(err, sqlx::Error::PoolTimedOut) {
            return Self::LockTimeout;
        }
        Self::Database(err)
    }
}

/// An open unit of work.
///
/// Lock methods block (up to the configured timeout) until no other
/// transaction holds the row, and keep it locked until this transaction
/// ends. Locking the same row twice in one transaction is allowed.
pub trait StoreTx: Send {
    /// Lock a variant row and return its current state.
    fn lock_variant(
        &mut self,
        id: VariantId,
    ) -> impl Future<Output = Result<Option<VariantSnapshot>, RepositoryError>> + Send;

    /// Overwrite the stock of a variant locked by this transaction.
    fn write_stock(
        &mut self,
        id: VariantId,
        stock: i32,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Read a customer without locking.
    fn find_customer(
        &mut self,
        id: CustomerId,
    ) -> impl Future<Output = Result<Option<Customer>, RepositoryError>> + Send;

    /// Read a design without locking.
    fn find_design(
        &mut self,
        id: DesignId,
    ) -> impl Future<Output = Result<Option<Design>, RepositoryError>> + Send;

    /// Insert a `pending` order and all of its items as one write.
    fn insert_order(
        &mut self,
        order: NewOrder,
    ) -> impl Future<Output = Result<Order, RepositoryError>> + Send;

    /// Lock an order row and return it with its items.
    fn lock_order(
        &mut self,
        id: OrderId,
    ) -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send;

    /// Set the status of an order locked by this transaction.
    fn write_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Make every write visible and release all locks.
    fn commit(self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// A store the order services can run against.
pub trait Database: Clone + Send + Sync + 'static {
    /// Transaction handle type.
    type Tx: StoreTx;

    /// Open a transaction.
    fn begin(&self) -> impl Future<Output = Result<Self::Tx, RepositoryError>> + Send;

    /// Read an order with its items.
    fn get_order(
        &self,
        id: OrderId,
    ) -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send;

    /// List orders newest first, optionally for one customer.
    fn list_orders(
        &self,
        customer_id: Option<CustomerId>,
    ) -> impl Future<Output = Result<Vec<Order>, RepositoryError>> + Send;

    /// Read the current state of a variant.
    fn get_variant(
        &self,
        id: VariantId,
    ) -> impl Future<Output = Result<Option<VariantSnapshot>, RepositoryError>> + Send;

    /// Revenue and best sellers over `paid` and `shipped` orders.
    fn sales_summary(
        &self,
        top_limit: usize,
    ) -> impl Future<Output = Result<SalesSummary, RepositoryError>> + Send;
}

/// Catalog writes used for seeding. Not part of the order flow.
pub trait CatalogWriter: Send + Sync {
    /// Register a size name. Idempotent.
    fn register_size(&self, name: &str) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Register a color name with an optional hex code. Idempotent.
    fn register_color(
        &self,
        name: &str,
        hex: Option<&str>,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Insert a customer.
    fn insert_customer(
        &self,
        email: &Email,
        name: &str,
        role: Role,
    ) -> impl Future<Output = Result<Customer, RepositoryError>> + Send;

    /// Insert a product.
    fn insert_product(
        &self,
        name: &str,
        base_price: Money,
    ) -> impl Future<Output = Result<Product, RepositoryError>> + Send;

    /// Insert a variant of an existing product. Unknown sizes and colors are
    /// registered on the fly.
    fn insert_variant(
        &self,
        product_id: ProductId,
        size: &str,
        color: &str,
        stock: i32,
        extra_price: Money,
    ) -> impl Future<Output = Result<VariantSnapshot, RepositoryError>> + Send;

    /// Insert a design owned by `customer_id`, priced with
    /// [`stitchworks_core::pricing::design_base_price`].
    fn insert_design(
        &self,
        customer_id: CustomerId,
        name: &str,
        locations: &[String],
        is_public: bool,
    ) -> impl Future<Output = Result<Design, RepositoryError>> + Send;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
/// * `max_connections` - Upper bound on pooled connections
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
