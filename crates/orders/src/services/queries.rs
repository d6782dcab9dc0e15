//! Read side: order lookups, listings, stock observation and sales figures.

use stitchworks_core::{CustomerId, OrderId, VariantId};

use crate::db::Database;
use crate::error::{OrderError, Resource};
use crate::models::{Actor, Order, SalesSummary, TOP_PRODUCTS_LIMIT, VariantSnapshot};

/// Read-only queries. None of them take row locks.
pub struct OrderQueries<'a, D> {
    db: &'a D,
}

impl<'a, D: Database> OrderQueries<'a, D> {
    #[must_use]
    pub const fn new(db: &'a D) -> Self {
        Self { db }
    }

    /// Load an order with its items.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] if the order does not exist.
    pub async fn order(&self, id: OrderId) -> Result<Order, OrderError> {
        self.db
            .get_order(id)
            .await?
            .ok_or(OrderError::NotFound(Resource::Order(id)))
    }

    /// Load an order on behalf of `actor`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] if the order does not exist and
    /// [`OrderError::Forbidden`] if `actor` may not see it.
    pub async fn order_for(&self, actor: &Actor, id: OrderId) -> Result<Order, OrderError> {
        let order = self.order(id).await?;
        if !actor.can_access(order.customer_id) {
            return Err(OrderError::Forbidden(format!(
                "customer {} cannot view order {id}",
                actor.customer_id
            )));
        }
        Ok(order)
    }

    /// A customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn orders_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Order>, OrderError> {
        Ok(self.db.list_orders(Some(customer_id)).await?)
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn all_orders(&self) -> Result<Vec<Order>, OrderError> {
        Ok(self.db.list_orders(None).await?)
    }

    /// Current state of a variant.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] if the variant does not exist.
    pub async fn variant(&self, id: VariantId) -> Result<VariantSnapshot, OrderError> {
        self.db
            .get_variant(id)
            .await?
            .ok_or(OrderError::NotFound(Resource::Variant(id)))
    }

    /// Revenue, completed order count and top sellers.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn sales_summary(&self) -> Result<SalesSummary, OrderError> {
        Ok(self.db.sales_summary(TOP_PRODUCTS_LIMIT).await?)
    }
}
