//! The order aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stitchworks_core::{CustomerId, DesignId, Money, OrderId, OrderItemId, OrderStatus, VariantId};

/// One line of a persisted order. The unit price is frozen at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub variant_id: VariantId,
    pub design_id: DesignId,
    pub quantity: i32,
    pub unit_price: Money,
}

impl OrderItem {
    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// A persisted order with its items in cart order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    /// Sum of the item line totals, fixed at creation.
    pub total: Money,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Recompute the total from the items.
    #[must_use]
    pub fn items_total(&self) -> Money {
        self.items.iter().map(OrderItem::line_total).sum()
    }

    /// Units per variant, ascending by variant ID.
    ///
    /// Lines sharing a variant are merged so each row is locked once.
    #[must_use]
    pub fn units_by_variant(&self) -> Vec<(VariantId, i32)> {
        let mut units = std::collections::BTreeMap::new();
        for item in &self.items {
            *units.entry(item.variant_id).or_insert(0) += item.quantity;
        }
        units.into_iter().collect()
    }
}

/// Line of an order that has not been written yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub variant_id: VariantId,
    pub design_id: DesignId,
    pub quantity: i32,
    pub unit_price: Money,
}

impl NewOrderItem {
    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Order draft handed to storage. Always inserted with status `pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub customer_id: CustomerId,
    pub total: Money,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    /// Build a draft whose total is the sum of its line totals.
    #[must_use]
    pub fn new(customer_id: CustomerId, items: Vec<NewOrderItem>) -> Self {
        let total = items.iter().map(NewOrderItem::line_total).sum();
        Self {
            customer_id,
            total,
            items,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: i32, variant: i32, quantity: i32, price: &str) -> OrderItem {
        OrderItem {
            id: OrderItemId::new(id),
            variant_id: VariantId::new(variant),
            design_id: DesignId::new(1),
            quantity,
            unit_price: price.parse().unwrap(),
        }
    }

    #[test]
    fn test_new_order_total_is_sum_of_lines() {
        let draft = NewOrder::new(
            CustomerId::new(1),
            vec![
                NewOrderItem {
                    variant_id: VariantId::new(1),
                    design_id: DesignId::new(1),
                    quantity: 3,
                    unit_price: "20.00".parse().unwrap(),
                },
                NewOrderItem {
                    variant_id: VariantId::new(2),
                    design_id: DesignId::new(1),
                    quantity: 1,
                    unit_price: "18.00".parse().unwrap(),
                },
            ],
        );
        assert_eq!(draft.total.to_string(), "78.00");
    }

    #[test]
    fn test_units_by_variant_merges_and_sorts() {
        let order = Order {
            id: OrderId::new(1),
            customer_id: CustomerId::new(1),
            status: OrderStatus::Pending,
            total: "0".parse().unwrap(),
            created_at: Utc::now(),
            items: vec![
                item(1, 9, 1, "10.00"),
                item(2, 3, 2, "10.00"),
                item(3, 9, 4, "10.00"),
            ],
        };
        assert_eq!(
            order.units_by_variant(),
            vec![(VariantId::new(3), 2), (VariantId::new(9), 5)]
        );
        assert_eq!(order.items_total().to_string(), "70.00");
    }
}
