//! Inventory ledger: the only code that changes variant stock.
//!
//! Both operations work inside a caller-supplied transaction, so a stock
//! change commits or rolls back together with the order write that caused it.

use stitchworks_core::VariantId;

use crate::db::StoreTx;
use crate::error::{OrderError, Resource};
use crate::models::VariantSnapshot;

/// Atomic check-and-decrement / increment on variant stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryLedger {
    low_stock_threshold: i32,
}

impl InventoryLedger {
    /// Create a ledger that warns when a reservation leaves less than
    /// `low_stock_threshold` units.
    #[must_use]
    pub const fn new(low_stock_threshold: i32) -> Self {
        Self {
            low_stock_threshold,
        }
    }

    /// Lock `variant_id`, check it has `quantity` units and take them.
    ///
    /// Returns the variant as it is after the decrement.
    ///
    /// # Errors
    ///
    /// - [`OrderError::Validation`] if `quantity` is below one
    /// - [`OrderError::NotFound`] if the variant does not exist
    /// - [`OrderError::InsufficientStock`] if stock is below `quantity`
    /// - [`OrderError::Busy`] if the row lock could not be acquired in time
    pub async fn reserve<T: StoreTx>(
        &self,
        tx: &mut T,
        variant_id: VariantId,
        quantity: i32,
    ) -> Result<VariantSnapshot, OrderError> {
        if quantity < 1 {
            return Err(OrderError::Validation(format!(
                "cannot reserve {quantity} units of variant {variant_id}"
            )));
        }

        let mut variant = tx
            .lock_variant(variant_id)
            .await?
            .ok_or(OrderError::NotFound(Resource::Variant(variant_id)))?;

        if variant.stock < quantity {
            return Err(OrderError::InsufficientStock {
                variant_id,
                requested: quantity,
                available: variant.stock,
            });
        }

        variant.stock -= quantity;
        tx.write_stock(variant_id, variant.stock).await?;

        tracing::debug!(
            variant_id = %variant_id,
            quantity,
            stock = variant.stock,
            "stock reserved"
        );
        if variant.stock < self.low_stock_threshold {
            tracing::warn!(
                variant_id = %variant_id,
                variant = %variant.label(),
                stock = variant.stock,
                "Low stock"
            );
        }

        Ok(variant)
    }

    /// Lock `variant_id` and give back `quantity` units.
    ///
    /// Call at most once per reservation; the ledger does not track which
    /// reservations have been restored.
    ///
    /// # Errors
    ///
    /// - [`OrderError::Validation`] if `quantity` is below one
    /// - [`OrderError::NotFound`] if the variant does not exist
    /// - [`OrderError::Busy`] if the row lock could not be acquired in time
    pub async fn restore<T: StoreTx>(
        &self,
        tx: &mut T,
        variant_id: VariantId,
        quantity: i32,
    ) -> Result<VariantSnapshot, OrderError> {
        if quantity < 1 {
            return Err(OrderError::Validation(format!(
                "cannot restore {quantity} units of variant {variant_id}"
            )));
        }

        let mut variant = tx
            .lock_variant(variant_id)
            .await?
            .ok_or(OrderError::NotFound(Resource::Variant(variant_id)))?;

        variant.stock = variant.stock.checked_add(quantity).ok_or_else(|| {
            OrderError::Validation(format!("stock overflow restoring variant {variant_id}"))
        })?;
        tx.write_stock(variant_id, variant.stock).await?;

        tracing::info!(
            variant_id = %variant_id,
            quantity,
            stock = variant.stock,
            "Stock restored"
        );
        Ok(variant)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use stitchworks_core::{Money, Role};

    use super::*;
    use crate::db::{CatalogWriter, Database, MemoryDatabase};

    async fn db_with_variant(stock: i32) -> (MemoryDatabase, VariantId) {
        let db = MemoryDatabase::new(Duration::from_secs(1));
        db.insert_customer(
            &"ana@example.com".parse().unwrap(),
            "Ana",
            Role::Customer,
        )
        .await
        .unwrap();
        let product = db
            .insert_product("Classic Tee", "15.00".parse().unwrap())
            .await
            .unwrap();
        let variant = db
            .insert_variant(product.id, "L", "Blanco", stock, Money::ZERO)
            .await
            .unwrap();
        (db, variant.id)
    }

    #[tokio::test]
    async fn test_reserve_decrements() {
        let (db, variant_id) = db_with_variant(5).await;
        let ledger = InventoryLedger::new(5);

        let mut tx = db.begin().await.unwrap();
        let after = ledger.reserve(&mut tx, variant_id, 3).await.unwrap();
        assert_eq!(after.stock, 2);
        tx.commit().await.unwrap();

        assert_eq!(db.get_variant(variant_id).await.unwrap().unwrap().stock, 2);
    }

    #[tokio::test]
    async fn test_reserve_exact_stock_reaches_zero() {
        let (db, variant_id) = db_with_variant(4).await;
        let ledger = InventoryLedger::new(5);

        let mut tx = db.begin().await.unwrap();
        assert_eq!(ledger.reserve(&mut tx, variant_id, 4).await.unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_reserve_insufficient_leaves_stock() {
        let (db, variant_id) = db_with_variant(2).await;
        let ledger = InventoryLedger::new(5);

        let mut tx = db.begin().await.unwrap();
        let err = ledger.reserve(&mut tx, variant_id, 3).await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::InsufficientStock {
                requested: 3,
                available: 2,
                ..
            }
        ));
        drop(tx);

        assert_eq!(db.get_variant(variant_id).await.unwrap().unwrap().stock, 2);
    }

    #[tokio::test]
    async fn test_reserve_unknown_variant() {
        let (db, _) = db_with_variant(2).await;
        let ledger = InventoryLedger::new(5);

        let mut tx = db.begin().await.unwrap();
        let err = ledger
            .reserve(&mut tx, VariantId::new(404), 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::NotFound(Resource::Variant(id)) if id == VariantId::new(404)
        ));
    }

    #[tokio::test]
    async fn test_reserve_rejects_zero_quantity() {
        let (db, variant_id) = db_with_variant(2).await;
        let ledger = InventoryLedger::new(5);

        let mut tx = db.begin().await.unwrap();
        assert!(matches!(
            ledger.reserve(&mut tx, variant_id, 0).await,
            Err(OrderError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_restore_increments() {
        let (db, variant_id) = db_with_variant(1).await;
        let ledger = InventoryLedger::new(5);

        let mut tx = db.begin().await.unwrap();
        assert_eq!(ledger.restore(&mut tx, variant_id, 3).await.unwrap().stock, 4);
        tx.commit().await.unwrap();

        assert_eq!(db.get_variant(variant_id).await.unwrap().unwrap().stock, 4);
    }
}
