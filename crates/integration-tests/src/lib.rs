//! Integration tests for the Stitchworks order core.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process backend only
//! cargo test -p stitchworks-integration-tests
//!
//! # Include the PostgreSQL suite
//! ORDERS_TEST_DATABASE_URL=postgres://localhost/stitchworks_test \
//!     cargo test -p stitchworks-integration-tests -- --include-ignored
//! ```
//!
//! # Test Categories
//!
//! - `order_creation` - Pricing, all-or-nothing reservation, racing orders
//! - `order_lifecycle` - Every (from, to) status pair and its stock effect
//! - `cancellation` - Stock compensation and ownership checks
//! - `notifications` - Delivery failures never fail a transition
//! - `contention` - Bounded lock waits surface as `Busy`
//! - `queries` - Read side and sales statistics
//! - `postgres` - The same flows against a real database (ignored by default)
