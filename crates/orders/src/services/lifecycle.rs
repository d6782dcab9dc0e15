//! Order state machine.
//!
//! | from      | to        | effect                                     |
//! |-----------|-----------|--------------------------------------------|
//! | pending   | paid      | finalize (verify reserved variants)        |
//! | pending   | cancelled | restore stock for every item               |
//! | paid      | shipped   | none                                       |
//!
//! Every other pair, including same-state moves, is rejected. Each accepted
//! transition notifies the customer after commit.
//!
//! Stock is reserved once, when the order is created. Finalizing a payment
//! locks the order's variant rows (ascending ID) to confirm they still exist
//! but never decrements again.

use stitchworks_core::{OrderId, OrderStatus};

use super::cancellation::restore_order_stock;
use super::inventory::InventoryLedger;
use super::notification::{NotificationDispatcher, Notifier};
use crate::db::{Database, StoreTx};
use crate::error::{OrderError, Resource};
use crate::models::Order;

/// Applies lifecycle transitions.
pub struct OrderLifecycle<'a, D, N> {
    db: &'a D,
    ledger: &'a InventoryLedger,
    dispatcher: &'a NotificationDispatcher<N>,
}

impl<'a, D: Database, N: Notifier> OrderLifecycle<'a, D, N> {
    /// Create a state machine over `db`.
    #[must_use]
    pub const fn new(
        db: &'a D,
        ledger: &'a InventoryLedger,
        dispatcher: &'a NotificationDispatcher<N>,
    ) -> Self {
        Self {
            db,
            ledger,
            dispatcher,
        }
    }

    /// Move `order_id` to `target`.
    ///
    /// The order row stays locked for the whole transition, so two
    /// transitions on one order never interleave. The returned order carries
    /// the new status.
    ///
    /// # Errors
    ///
    /// - [`OrderError::NotFound`] if the order (or, when paying, one of its variants) is missing
    /// - [`OrderError::IllegalTransition`] if `target` is not reachable from the current status
    /// - [`OrderError::Busy`] on lock contention
    #[tracing::instrument(skip(self))]
    pub async fn transition(
        &self,
        order_id: OrderId,
        target: OrderStatus,
    ) -> Result<Order, OrderError> {
        let mut tx = self.db.begin().await?;

        let mut order = tx
            .lock_order(order_id)
            .await?
            .ok_or(OrderError::NotFound(Resource::Order(order_id)))?;

        let from = order.status;
        if !from.can_transition_to(target) {
            return Err(OrderError::IllegalTransition { from, to: target });
        }

        match target {
            OrderStatus::Paid => finalize(&mut tx, &order).await?,
            OrderStatus::Cancelled => {
                restore_order_stock(self.ledger, &mut tx, &order).await?;
            }
            OrderStatus::Pending | OrderStatus::Shipped => {}
        }

        tx.write_status(order_id, target).await?;
        let customer = tx.find_customer(order.customer_id).await?;
        tx.commit().await?;

        order.status = target;
        tracing::info!(order_id = %order_id, from = %from, to = %target, "Order status changed");

        self.dispatcher
            .dispatch(customer.as_ref(), order_id, target)
            .await;

        Ok(order)
    }
}

/// Confirm every variant the order reserved is still there.
async fn finalize<T: StoreTx>(tx: &mut T, order: &Order) -> Result<(), OrderError> {
    for (variant_id, _) in order.units_by_variant() {
        tx.lock_variant(variant_id)
            .await?
            .ok_or(OrderError::NotFound(Resource::Variant(variant_id)))?;
    }
    Ok(())
}
