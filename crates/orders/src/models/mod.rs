//! Domain models for the order core.
//!
//! Orders hold their items by value; items reference variants and designs by
//! ID only, so nothing here owns catalog rows.

pub mod catalog;
pub mod order;
pub mod request;
pub mod stats;

pub use catalog::{Customer, Design, Product, VariantSnapshot};
pub use order::{NewOrder, NewOrderItem, Order, OrderItem};
pub use request::{Actor, CartItem, CartLine, MAX_CART_LINES, ValidatedCart};
pub use stats::{SalesSummary, TOP_PRODUCTS_LIMIT, TopProduct};
