//! Catalog rows as seen by the order core.
//!
//! The core only reads these (variants also get their stock written by the
//! inventory ledger); creating and editing them happens elsewhere.

use serde::{Deserialize, Serialize};
use stitchworks_core::{CustomerId, DesignId, Email, Money, ProductId, Role, VariantId};

/// A customer who can place orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub email: Email,
    pub name: String,
    pub role: Role,
}

/// A garment model with a base price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub base_price: Money,
}

/// Current state of one purchasable (product, size, color) combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSnapshot {
    pub id: VariantId,
    pub product_id: ProductId,
    pub product_name: String,
    pub size: String,
    pub color: String,
    /// Units available. Never negative.
    pub stock: i32,
    /// Price of the parent product.
    pub base_price: Money,
    /// Surcharge for this particular size/color.
    pub extra_price: Money,
}

impl VariantSnapshot {
    /// Price of the blank garment before customisation.
    #[must_use]
    pub fn unit_base_price(&self) -> Money {
        self.base_price + self.extra_price
    }

    /// Human readable label, e.g. `Classic Tee (M / Negro)`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} ({} / {})", self.product_name, self.size, self.color)
    }
}

/// A customer-owned print design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Design {
    pub id: DesignId,
    pub customer_id: CustomerId,
    pub name: String,
    /// Placement names such as `front` or `back`.
    pub locations: Vec<String>,
    pub is_public: bool,
    pub final_price: Money,
}

impl Design {
    /// Whether `customer` may put this design on an order.
    #[must_use]
    pub fn usable_by(&self, customer: CustomerId) -> bool {
        self.is_public || self.customer_id == customer
    }
}
