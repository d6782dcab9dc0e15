//! Order services.
//!
//! [`OrderService`] owns the database handle, the inventory ledger and the
//! notification dispatcher, and hands out short-lived views for each concern:
//!
//! - [`OrderCoordinator`] - cart to pending order, all or nothing
//! - [`OrderLifecycle`] - status transitions with their stock effects
//! - [`CancellationCompensator`] - customer-initiated cancellation
//! - [`OrderQueries`] - reads and sales figures

pub mod cancellation;
pub mod checkout;
pub mod inventory;
pub mod lifecycle;
pub mod notification;
pub mod queries;

use stitchworks_core::{OrderId, OrderStatus};

use crate::config::ServiceSettings;
use crate::db::Database;
use crate::error::OrderError;
use crate::models::{Actor, Order, ValidatedCart};

pub use cancellation::{CancellationAck, CancellationCompensator};
pub use checkout::OrderCoordinator;
pub use inventory::InventoryLedger;
pub use lifecycle::OrderLifecycle;
pub use notification::{
    ConfiguredNotifier, EmailNotifier, LogNotifier, NotificationDispatcher, Notifier, NotifyError,
    StatusNotice,
};
pub use queries::OrderQueries;

/// Entry point to the order core.
///
/// Cheap to share behind an `Arc`; every operation takes `&self`.
#[derive(Debug, Clone)]
pub struct OrderService<D, N> {
    db: D,
    ledger: InventoryLedger,
    dispatcher: NotificationDispatcher<N>,
}

impl<D: Database, N: Notifier> OrderService<D, N> {
    /// Assemble a service over `db`, delivering notices through `notifier`.
    #[must_use]
    pub const fn new(db: D, notifier: N, settings: &ServiceSettings) -> Self {
        Self {
            db,
            ledger: InventoryLedger::new(settings.low_stock_threshold),
            dispatcher: NotificationDispatcher::new(notifier, settings.notify_timeout),
        }
    }

    /// The underlying database.
    #[must_use]
    pub const fn db(&self) -> &D {
        &self.db
    }

    /// The notifier used for status notices.
    #[must_use]
    pub const fn notifier(&self) -> &N {
        self.dispatcher.notifier()
    }

    #[must_use]
    pub const fn coordinator(&self) -> OrderCoordinator<'_, D> {
        OrderCoordinator::new(&self.db, &self.ledger)
    }

    #[must_use]
    pub const fn lifecycle(&self) -> OrderLifecycle<'_, D, N> {
        OrderLifecycle::new(&self.db, &self.ledger, &self.dispatcher)
    }

    #[must_use]
    pub const fn compensator(&self) -> CancellationCompensator<'_, D, N> {
        CancellationCompensator::new(&self.db, &self.ledger, &self.dispatcher)
    }

    #[must_use]
    pub const fn queries(&self) -> OrderQueries<'_, D> {
        OrderQueries::new(&self.db)
    }

    /// See [`OrderCoordinator::create_order`].
    ///
    /// # Errors
    ///
    /// Propagates the coordinator's errors.
    pub async fn create_order(&self, cart: &ValidatedCart) -> Result<Order, OrderError> {
        self.coordinator().create_order(cart).await
    }

    /// See [`OrderLifecycle::transition`].
    ///
    /// # Errors
    ///
    /// Propagates the state machine's errors.
    pub async fn transition(
        &self,
        order_id: OrderId,
        target: OrderStatus,
    ) -> Result<Order, OrderError> {
        self.lifecycle().transition(order_id, target).await
    }

    /// See [`CancellationCompensator::cancel`].
    ///
    /// # Errors
    ///
    /// Propagates the compensator's errors.
    pub async fn cancel(
        &self,
        order_id: OrderId,
        actor: &Actor,
    ) -> Result<CancellationAck, OrderError> {
        self.compensator().cancel(order_id, actor).await
    }
}
