//! In-process backend.
//!
//! Tables are maps of rows, each row behind its own `tokio::sync::Mutex`.
//! A [`MemoryTx`] keeps the owned guard of every row it locks, together with
//! an undo copy of the row as it was when locked. Committing drops the undo
//! copies and publishes inserted orders; dropping the transaction without
//! committing writes the undo copies back. Lock waits are bounded by the
//! configured timeout and fail with [`RepositoryError::LockTimeout`].
//!
//! Plain reads also take the row mutex briefly, so they wait for (rather
//! than see through) a transaction holding the row.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use chrono::Utc;
use stitchworks_core::{
    CustomerId, DesignId, Email, Money, OrderId, OrderItemId, OrderStatus, ProductId, Role,
    VariantId, pricing,
};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::{CatalogWriter, Database, RepositoryError, StoreTx};
use crate::config::ServiceSettings;
use crate::models::{
    Customer, Design, NewOrder, Order, OrderItem, Product, SalesSummary, TopProduct,
    VariantSnapshot,
};

type Row<T> = Arc<Mutex<T>>;

#[derive(Debug, Default)]
struct Sequences {
    customer: AtomicI32,
    product: AtomicI32,
    variant: AtomicI32,
    design: AtomicI32,
    order: AtomicI32,
    order_item: AtomicI32,
}

fn next_id(seq: &AtomicI32) -> i32 {
    seq.fetch_add(1, Ordering::Relaxed) + 1
}

#[derive(Debug, Default)]
struct Tables {
    sizes: RwLock<HashSet<String>>,
    colors: RwLock<HashMap<String, Option<String>>>,
    customers: RwLock<HashMap<CustomerId, Customer>>,
    products: RwLock<HashMap<ProductId, Product>>,
    designs: RwLock<HashMap<DesignId, Design>>,
    variants: RwLock<BTreeMap<VariantId, Row<VariantSnapshot>>>,
    orders: RwLock<BTreeMap<OrderId, Row<Order>>>,
    ids: Sequences,
}

/// In-process [`Database`].
///
/// Cloning is cheap; clones share the same tables.
#[derive(Debug, Clone)]
pub struct MemoryDatabase {
    tables: Arc<Tables>,
    lock_timeout: Duration,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new(ServiceSettings::default().lock_timeout)
    }
}

impl MemoryDatabase {
    /// Create an empty database whose row-lock waits give up after
    /// `lock_timeout`.
    #[must_use]
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            tables: Arc::new(Tables::default()),
            lock_timeout,
        }
    }

    async fn lock_row<T>(&self, row: Row<T>) -> Result<OwnedMutexGuard<T>, RepositoryError> {
        tokio::time::timeout(self.lock_timeout, row.lock_owned())
            .await
            .map_err(|_| RepositoryError::LockTimeout)
    }

    async fn read_row<T: Clone>(&self, row: &Row<T>) -> Result<T, RepositoryError> {
        let guard = tokio::time::timeout(self.lock_timeout, row.lock())
            .await
            .map_err(|_| RepositoryError::LockTimeout)?;
        Ok(guard.clone())
    }
}

impl Database for MemoryDatabase {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, RepositoryError> {
        Ok(MemoryTx {
            db: self.clone(),
            variants: BTreeMap::new(),
            orders: BTreeMap::new(),
            inserted: Vec::new(),
            committed: false,
        })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = self.tables.orders.read().await.get(&id).cloned();
        match row {
            Some(row) => Ok(Some(self.read_row(&row).await?)),
            None => Ok(None),
        }
    }

    async fn list_orders(
        &self,
        customer_id: Option<CustomerId>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<Row<Order>> = self.tables.orders.read().await.values().cloned().collect();

        let mut orders = Vec::with_capacity(rows.len());
        for row in &rows {
            let order = self.read_row(row).await?;
            if customer_id.is_none_or(|id| id == order.customer_id) {
                orders.push(order);
            }
        }
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(orders)
    }

    async fn get_variant(&self, id: VariantId) -> Result<Option<VariantSnapshot>, RepositoryError> {
        let row = self.tables.variants.read().await.get(&id).cloned();
        match row {
            Some(row) => Ok(Some(self.read_row(&row).await?)),
            None => Ok(None),
        }
    }

    async fn sales_summary(&self, top_limit: usize) -> Result<SalesSummary, RepositoryError> {
        let completed: Vec<Order> = self
            .list_orders(None)
            .await?
            .into_iter()
            .filter(|order| order.status.is_completed_sale())
            .collect();

        let revenue: Money = completed.iter().map(|order| order.total).sum();
        let completed_orders = i64::try_from(completed.len())
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        let mut units: BTreeMap<ProductId, (String, i64)> = BTreeMap::new();
        for item in completed.iter().flat_map(|order| &order.items) {
            let variant = self.get_variant(item.variant_id).await?.ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "order item {} references missing variant {}",
                    item.id, item.variant_id
                ))
            })?;
            units
                .entry(variant.product_id)
                .or_insert_with(|| (variant.product_name.clone(), 0))
                .1 += i64::from(item.quantity);
        }

        let mut top_products: Vec<TopProduct> = units
            .into_iter()
            .map(|(product_id, (name, units_sold))| TopProduct {
                product_id,
                name,
                units_sold,
            })
            .collect();
        top_products.sort_by(|a, b| {
            b.units_sold
                .cmp(&a.units_sold)
                .then_with(|| a.product_id.cmp(&b.product_id))
        });
        top_products.truncate(top_limit);

        Ok(SalesSummary {
            revenue,
            completed_orders,
            top_products,
        })
    }
}

impl CatalogWriter for MemoryDatabase {
    async fn register_size(&self, name: &str) -> Result<(), RepositoryError> {
        self.tables.sizes.write().await.insert(name.to_string());
        Ok(())
    }

    async fn register_color(&self, name: &str, hex: Option<&str>) -> Result<(), RepositoryError> {
        let mut colors = self.tables.colors.write().await;
        let entry = colors.entry(name.to_string()).or_default();
        if let Some(hex) = hex {
            *entry = Some(hex.to_string());
        }
        Ok(())
    }

    async fn insert_customer(
        &self,
        email: &Email,
        name: &str,
        role: Role,
    ) -> Result<Customer, RepositoryError> {
        let mut customers = self.tables.customers.write().await;
        if customers.values().any(|c| c.email == *email) {
            return Err(RepositoryError::Conflict(format!(
                "customer with email {email} already exists"
            )));
        }

        let customer = Customer {
            id: CustomerId::new(next_id(&self.tables.ids.customer)),
            email: email.clone(),
            name: name.to_string(),
            role,
        };
        customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn insert_product(&self, name: &str, base_price: Money) -> Result<Product, RepositoryError> {
        let product = Product {
            id: ProductId::new(next_id(&self.tables.ids.product)),
            name: name.to_string(),
            base_price,
        };
        self.tables
            .products
            .write()
            .await
            .insert(product.id, product.clone());
        Ok(product)
    }

    async fn insert_variant(
        &self,
        product_id: ProductId,
        size: &str,
        color: &str,
        stock: i32,
        extra_price: Money,
    ) -> Result<VariantSnapshot, RepositoryError> {
        if stock < 0 {
            return Err(RepositoryError::Conflict(format!(
                "stock cannot be negative: {stock}"
            )));
        }
        let product = self
            .tables
            .products
            .read()
            .await
            .get(&product_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)?;

        self.register_size(size).await?;
        self.register_color(color, None).await?;

        let variant = VariantSnapshot {
            id: VariantId::new(next_id(&self.tables.ids.variant)),
            product_id,
            product_name: product.name,
            size: size.to_string(),
            color: color.to_string(),
            stock,
            base_price: product.base_price,
            extra_price,
        };
        self.tables
            .variants
            .write()
            .await
            .insert(variant.id, Arc::new(Mutex::new(variant.clone())));
        Ok(variant)
    }

    async fn insert_design(
        &self,
        customer_id: CustomerId,
        name: &str,
        locations: &[String],
        is_public: bool,
    ) -> Result<Design, RepositoryError> {
        if !self.tables.customers.read().await.contains_key(&customer_id) {
            return Err(RepositoryError::NotFound);
        }

        let design = Design {
            id: DesignId::new(next_id(&self.tables.ids.design)),
            customer_id,
            name: name.to_string(),
            locations: locations.to_vec(),
            is_public,
            final_price: pricing::design_base_price(is_public),
        };
        self.tables
            .designs
            .write()
            .await
            .insert(design.id, design.clone());
        Ok(design)
    }
}

/// A row held by a transaction, with its contents at lock time.
struct Locked<T> {
    guard: OwnedMutexGuard<T>,
    undo: T,
}

impl<T: Clone> Locked<T> {
    fn new(guard: OwnedMutexGuard<T>) -> Self {
        let undo = (*guard).clone();
        Self { guard, undo }
    }

    fn rollback(&mut self) {
        *self.guard = self.undo.clone();
    }
}

/// Transaction over a [`MemoryDatabase`].
pub struct MemoryTx {
    db: MemoryDatabase,
    variants: BTreeMap<VariantId, Locked<VariantSnapshot>>,
    orders: BTreeMap<OrderId, Locked<Order>>,
    inserted: Vec<Order>,
    committed: bool,
}

impl StoreTx for MemoryTx {
    async fn lock_variant(
        &mut self,
        id: VariantId,
    ) -> Result<Option<VariantSnapshot>, RepositoryError> {
        if let Some(locked) = self.variants.get(&id) {
            return Ok(Some((*locked.guard).clone()));
        }

        let row = self.db.tables.variants.read().await.get(&id).cloned();
        let Some(row) = row else {
            return Ok(None);
        };
        let guard = self.db.lock_row(row).await?;
        tracing::debug!(variant_id = %id, "variant row locked");

        let snapshot = (*guard).clone();
        self.variants.insert(id, Locked::new(guard));
        Ok(Some(snapshot))
    }

    async fn write_stock(&mut self, id: VariantId, stock: i32) -> Result<(), RepositoryError> {
        if stock < 0 {
            return Err(RepositoryError::Conflict(format!(
                "stock for variant {id} cannot go negative"
            )));
        }
        let locked = self.variants.get_mut(&id).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("variant {id} written without a lock"))
        })?;
        locked.guard.stock = stock;
        Ok(())
    }

    async fn find_customer(&mut self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        Ok(self.db.tables.customers.read().await.get(&id).cloned())
    }

    async fn find_design(&mut self, id: DesignId) -> Result<Option<Design>, RepositoryError> {
        Ok(self.db.tables.designs.read().await.get(&id).cloned())
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, RepositoryError> {
        let ids = &self.db.tables.ids;
        let items = order
            .items
            .into_iter()
            .map(|item| OrderItem {
                id: OrderItemId::new(next_id(&ids.order_item)),
                variant_id: item.variant_id,
                design_id: item.design_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect();

        let order = Order {
            id: OrderId::new(next_id(&ids.order)),
            customer_id: order.customer_id,
            status: OrderStatus::Pending,
            total: order.total,
            created_at: Utc::now(),
            items,
        };
        self.inserted.push(order.clone());
        Ok(order)
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        if let Some(locked) = self.orders.get(&id) {
            return Ok(Some((*locked.guard).clone()));
        }
        if let Some(order) = self.inserted.iter().find(|order| order.id == id) {
            return Ok(Some(order.clone()));
        }

        let row = self.db.tables.orders.read().await.get(&id).cloned();
        let Some(row) = row else {
            return Ok(None);
        };
        let guard = self.db.lock_row(row).await?;
        tracing::debug!(order_id = %id, "order row locked");

        let order = (*guard).clone();
        self.orders.insert(id, Locked::new(guard));
        Ok(Some(order))
    }

    async fn write_status(&mut self, id: OrderId, status: OrderStatus) -> Result<(), RepositoryError> {
        if let Some(locked) = self.orders.get_mut(&id) {
            locked.guard.status = status;
            return Ok(());
        }
        if let Some(order) = self.inserted.iter_mut().find(|order| order.id == id) {
            order.status = status;
            return Ok(());
        }
        Err(RepositoryError::DataCorruption(format!(
            "order {id} written without a lock"
        )))
    }

    async fn commit(mut self) -> Result<(), RepositoryError> {
        let inserted = std::mem::take(&mut self.inserted);
        if !inserted.is_empty() {
            let mut orders = self.db.tables.orders.write().await;
            for order in inserted {
                orders.insert(order.id, Arc::new(Mutex::new(order)));
            }
        }
        self.committed = true;
        Ok(())
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for locked in self.variants.values_mut() {
            locked.rollback();
        }
        for locked in self.orders.values_mut() {
            locked.rollback();
        }
        if !self.variants.is_empty() || !self.orders.is_empty() || !self.inserted.is_empty() {
            tracing::debug!(
                variants = self.variants.len(),
                orders = self.orders.len(),
                discarded_orders = self.inserted.len(),
                "transaction rolled back"
            );
        }
    }
}
