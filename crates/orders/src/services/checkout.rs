//! Order transaction coordinator: turns a validated cart into one order.

use std::collections::BTreeSet;

use stitchworks_core::{DesignId, pricing};

use super::inventory::InventoryLedger;
use crate::db::{Database, StoreTx};
use crate::error::{OrderError, Resource};
use crate::models::{NewOrder, NewOrderItem, Order, ValidatedCart};

/// Creates orders all-or-nothing.
pub struct OrderCoordinator<'a, D> {
    db: &'a D,
    ledger: &'a InventoryLedger,
}

impl<'a, D: Database> OrderCoordinator<'a, D> {
    /// Create a coordinator over `db`.
    #[must_use]
    pub const fn new(db: &'a D, ledger: &'a InventoryLedger) -> Self {
        Self { db, ledger }
    }

    /// Reserve stock for every line, price it and persist a `pending` order.
    ///
    /// Lines are reserved in ascending variant order so concurrent orders
    /// always lock rows in the same sequence. Items are stored in cart order.
    /// On any error the transaction is dropped and no stock changes survive.
    ///
    /// # Errors
    ///
    /// - [`OrderError::NotFound`] for an unknown customer, design or variant
    /// - [`OrderError::Forbidden`] for another customer's private design
    /// - [`OrderError::InsufficientStock`] naming the first line that cannot be filled
    /// - [`OrderError::Busy`] on lock contention
    #[tracing::instrument(
        skip(self, cart),
        fields(customer_id = %cart.customer_id(), lines = cart.lines().len())
    )]
    pub async fn create_order(&self, cart: &ValidatedCart) -> Result<Order, OrderError> {
        let customer_id = cart.customer_id();
        let mut tx = self.db.begin().await?;

        tx.find_customer(customer_id)
            .await?
            .ok_or(OrderError::NotFound(Resource::Customer(customer_id)))?;
        check_designs(&mut tx, cart).await?;

        let mut priced: Vec<Option<NewOrderItem>> = vec![None; cart.lines().len()];
        for line in cart.lines_in_lock_order() {
            let variant = self
                .ledger
                .reserve(&mut tx, line.variant_id, line.quantity)
                .await?;

            let unit_price = pricing::compute_price(
                variant.unit_base_price(),
                pricing::extra_locations(line.locations.len()),
                line.is_public,
            );
            if let Some(slot) = priced.get_mut(line.position) {
                *slot = Some(NewOrderItem {
                    variant_id: line.variant_id,
                    design_id: line.design_id,
                    quantity: line.quantity,
                    unit_price,
                });
            }
        }

        let items: Vec<NewOrderItem> = priced.into_iter().flatten().collect();
        let order = tx.insert_order(NewOrder::new(customer_id, items)).await?;
        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            total = %order.total,
            items = order.items.len(),
            "Order created"
        );
        Ok(order)
    }
}

/// Every design on the cart must exist and be usable by the customer.
async fn check_designs<T: StoreTx>(tx: &mut T, cart: &ValidatedCart) -> Result<(), OrderError> {
    let design_ids: BTreeSet<DesignId> = cart.lines().iter().map(|line| line.design_id).collect();

    for design_id in design_ids {
        let design = tx
            .find_design(design_id)
            .await?
            .ok_or(OrderError::NotFound(Resource::Design(design_id)))?;
        if !design.usable_by(cart.customer_id()) {
            return Err(OrderError::Forbidden(format!(
                "design {design_id} is private to another customer"
            )));
        }
    }
    Ok(())
}
