//! Stitchworks Orders - Order and inventory transaction core.
//!
//! Accepts carts of customised garments, reserves stock and persists the
//! resulting order in one transaction, then moves orders through their
//! lifecycle (`pending -> paid -> shipped`, or `pending -> cancelled`) with
//! compensating stock effects.
//!
//! # Architecture
//!
//! ```text
//! OrderService ─┬─ OrderCoordinator ──► InventoryLedger, pricing
//!               ├─ OrderLifecycle ────► InventoryLedger (compensation)
//!               ├─ CancellationCompensator
//!               ├─ OrderQueries
//!               └─ NotificationDispatcher ──► Notifier (after commit)
//!                          │
//!                     db::Database ──► PgDatabase | MemoryDatabase
//! ```
//!
//! Every mutation runs inside one [`db::StoreTx`]. Dropping a transaction
//! without calling [`db::StoreTx::commit`] rolls back every write made so far.
//!
//! # Modules
//!
//! - [`config`] - Environment configuration
//! - [`db`] - Persistence traits and the `PostgreSQL` / in-process backends
//! - [`error`] - Error taxonomy surfaced to callers
//! - [`models`] - Orders, catalog snapshots, validated requests, statistics
//! - [`services`] - Ledger, coordinator, state machine, compensator, queries, notifications

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use config::{ConfigError, EmailConfig, OrdersConfig, ServiceSettings};
pub use error::{OrderError, Resource};
pub use services::OrderService;
