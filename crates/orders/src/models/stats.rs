//! Sales statistics over completed orders.

use serde::{Deserialize, Serialize};
use stitchworks_core::{Money, ProductId};

/// Maximum number of products in [`SalesSummary::top_products`].
pub const TOP_PRODUCTS_LIMIT: usize = 5;

/// Revenue figures over `paid` and `shipped` orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub revenue: Money,
    pub completed_orders: i64,
    /// Best sellers by units, descending; ties by ascending product ID.
    pub top_products: Vec<TopProduct>,
}

/// Units sold for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopProduct {
    pub product_id: ProductId,
    pub name: String,
    pub units_sold: i64,
}
