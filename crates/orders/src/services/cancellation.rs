//! Cancellation compensator: undoes a pending order's stock reservation.

use stitchworks_core::{OrderId, OrderStatus};

use super::inventory::InventoryLedger;
use super::notification::{NotificationDispatcher, Notifier};
use crate::db::{Database, StoreTx};
use crate::error::{OrderError, Resource};
use crate::models::{Actor, Order};

/// Result of a successful cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancellationAck {
    pub order_id: OrderId,
    /// Units returned to stock across all variants. Widened because the
    /// per-variant counts can sum past `i32::MAX`.
    pub restored_units: i64,
    /// Whether the customer notice was delivered.
    pub notified: bool,
}

/// Give back every unit `order` reserved, one variant at a time in
/// ascending ID order. Returns the number of units restored.
pub(crate) async fn restore_order_stock<T: StoreTx>(
    ledger: &InventoryLedger,
    tx: &mut T,
    order: &Order,
) -> Result<i64, OrderError> {
    let mut restored = 0_i64;
    for (variant_id, units) in order.units_by_variant() {
        ledger.restore(tx, variant_id, units).await?;
        restored += i64::from(units);
    }
    Ok(restored)
}

/// Cancels pending orders on behalf of their owner (or an admin).
pub struct CancellationCompensator<'a, D, N> {
    db: &'a D,
    ledger: &'a InventoryLedger,
    dispatcher: &'a NotificationDispatcher<N>,
}

impl<'a, D: Database, N: Notifier> CancellationCompensator<'a, D, N> {
    /// Create a compensator over `db`.
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

    /// Cancel `order_id`, restoring its stock, then notify the customer.
    ///
    /// Restoring stock and writing the `cancelled` status happen in one
    /// transaction. A second cancel fails on the status guard, so stock is
    /// never restored twice.
    ///
    /// # Errors
    ///
    /// - [`OrderError::NotFound`] if the order does not exist
    /// - [`OrderError::Forbidden`] if `actor` neither owns the order nor is an admin
    /// - [`OrderError::IllegalTransition`] if the order is not `pending`
    /// - [`OrderError::Busy`] on lock contention
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.customer_id))]
    pub async fn cancel(
        &self,
        order_id: OrderId,
        actor: &Actor,
    ) -> Result<CancellationAck, OrderError> {
        let mut tx = self.db.begin().await?;

        let order = tx
            .lock_order(order_id)
            .await?
            .ok_or(OrderError::NotFound(Resource::Order(order_id)))?;

        if !actor.can_access(order.customer_id) {
            return Err(OrderError::Forbidden(format!(
                "customer {} cannot cancel order {order_id}",
                actor.customer_id
            )));
        }
        if !order.status.can_transition_to(OrderStatus::Cancelled) {
            return Err(OrderError::IllegalTransition {
                from: order.status,
                to: OrderStatus::Cancelled,
            });
        }

        let restored_units = restore_order_stock(self.ledger, &mut tx, &order).await?;
        tx.write_status(order_id, OrderStatus::Cancelled).await?;
        let customer = tx.find_customer(order.customer_id).await?;
        tx.commit().await?;

        tracing::info!(order_id = %order_id, restored_units, "Order cancelled");

        let notified = self
            .dispatcher
            .dispatch(customer.as_ref(), order_id, OrderStatus::Cancelled)
            .await;

        Ok(CancellationAck {
            order_id,
            restored_units,
            notified,
        })
    }
}
