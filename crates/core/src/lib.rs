//! Stitchworks Core - Shared domain types and pricing rules.
//!
//! This crate provides the types used across all Stitchworks components:
//! - `orders` - Order/inventory transaction core
//! - `cli` - Command-line tools for migrations, seeding and order operations
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no SMTP clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, emails, and statuses
//! - [`pricing`] - Line-item pricing for customised garments

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod types;

pub use types::*;
