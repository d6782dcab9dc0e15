//! `PostgreSQL` backend.
//!
//! Row locks are `SELECT ... FOR UPDATE`; every transaction starts with
//! `SET LOCAL lock_timeout` so contention surfaces as SQLSTATE `55P03`
//! (mapped to [`RepositoryError::LockTimeout`]) instead of hanging.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use stitchworks_core::{
    CustomerId, DesignId, Email, Money, OrderId, OrderItemId, OrderStatus, ProductId, Role,
    VariantId, pricing,
};

use super::{CatalogWriter, Database, RepositoryError, StoreTx};
use crate::models::{
    Customer, Design, NewOrder, Order, OrderItem, Product, SalesSummary, TopProduct,
    VariantSnapshot,
};

// =============================================================================
// Row Types
// =============================================================================

const VARIANT_SELECT: &str = r"
    SELECT v.id, v.product_id, p.name AS product_name, s.name AS size, c.name AS color,
           v.stock, p.base_price, v.extra_price
    FROM variants v
    JOIN products p ON p.id = v.product_id
    JOIN sizes s ON s.id = v.size_id
    JOIN colors c ON c.id = v.color_id
    WHERE v.id = $1";

const ORDER_COLUMNS: &str = "id, customer_id, status, total, created_at";

const ITEM_COLUMNS: &str = "id, order_id, variant_id, design_id, quantity, unit_price";

#[derive(Debug, FromRow)]
struct VariantRow {
    id: VariantId,
    product_id: ProductId,
    product_name: String,
    size: String,
    color: String,
    stock: i32,
    base_price: Money,
    extra_price: Money,
}

impl From<VariantRow> for VariantSnapshot {
    fn from(row: VariantRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            size: row.size,
            color: row.color,
            stock: row.stock,
            base_price: row.base_price,
            extra_price: row.extra_price,
        }
    }
}

#[derive(Debug, FromRow)]
struct CustomerRow {
    id: CustomerId,
    email: Email,
    name: String,
    role: Role,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            name: row.name,
            role: row.role,
        }
    }
}

#[derive(Debug, FromRow)]
struct DesignRow {
    id: DesignId,
    customer_id: CustomerId,
    name: String,
    locations: Vec<String>,
    is_public: bool,
    final_price: Money,
}

impl From<DesignRow> for Design {
    fn from(row: DesignRow) -> Self {
        Self {
            id: row.id,
            customer_id: row.customer_id,
            name: row.name,
            locations: row.locations,
            is_public: row.is_public,
            final_price: row.final_price,
        }
    }
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: OrderId,
    customer_id: CustomerId,
    status: OrderStatus,
    total: Money,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            customer_id: self.customer_id,
            status: self.status,
            total: self.total,
            created_at: self.created_at,
            items,
        }
    }
}

#[derive(Debug, FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    variant_id: VariantId,
    design_id: DesignId,
    quantity: i32,
    unit_price: Money,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: row.id,
            variant_id: row.variant_id,
            design_id: row.design_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

#[derive(Debug, FromRow)]
struct RevenueRow {
    revenue: Money,
    completed_orders: i64,
}

#[derive(Debug, FromRow)]
struct TopProductRow {
    product_id: ProductId,
    name: String,
    units_sold: i64,
}

/// Attach items (already sorted by ID) to their orders, keeping the order rows' sequence.
fn assemble(orders: Vec<OrderRow>, items: Vec<OrderItemRow>) -> Vec<Order> {
    let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item.into());
    }
    orders
        .into_iter()
        .map(|row| {
            let items = by_order.remove(&row.id).unwrap_or_default();
            row.into_order(items)
        })
        .collect()
}

// =============================================================================
// Database
// =============================================================================

/// [`Database`] backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgDatabase {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgDatabase {
    /// Wrap a pool. Each transaction waits at most `lock_timeout` for a row lock.
    #[must_use]
    pub const fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_orders(
        &self,
        customer_id: Option<CustomerId>,
        order_id: Option<OrderId>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE ($1::INT IS NULL OR customer_id = $1)
               AND ($2::INT IS NULL OR id = $2)
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(customer_id)
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i32> = orders.iter().map(|order| order.id.as_i32()).collect();
        let items = sqlx::query_as::<_, OrderItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY id"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble(orders, items))
    }
}

impl Database for PgDatabase {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let millis = self.lock_timeout.as_millis();
        sqlx::query(&format!("SET LOCAL lock_timeout = '{millis}ms'"))
            .execute(&mut *tx)
            .await?;
        Ok(PgTx { tx })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.fetch_orders(None, Some(id)).await?.into_iter().next())
    }

    async fn list_orders(
        &self,
        customer_id: Option<CustomerId>,
    ) -> Result<Vec<Order>, RepositoryError> {
        self.fetch_orders(customer_id, None).await
    }

    async fn get_variant(&self, id: VariantId) -> Result<Option<VariantSnapshot>, RepositoryError> {
        let row = sqlx::query_as::<_, VariantRow>(VARIANT_SELECT)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn sales_summary(&self, top_limit: usize) -> Result<SalesSummary, RepositoryError> {
        let totals = sqlx::query_as::<_, RevenueRow>(
            r"
            SELECT COALESCE(SUM(total), 0) AS revenue, COUNT(*) AS completed_orders
            FROM orders
            WHERE status IN ('paid', 'shipped')
            ",
        )
        .fetch_one(&self.pool)
        .await?;

        let limit = i64::try_from(top_limit)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        let top = sqlx::query_as::<_, TopProductRow>(
            r"
            SELECT p.id AS product_id, p.name, SUM(oi.quantity)::BIGINT AS units_sold
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            JOIN variants v ON v.id = oi.variant_id
            JOIN products p ON p.id = v.product_id
            WHERE o.status IN ('paid', 'shipped')
            GROUP BY p.id, p.name
            ORDER BY units_sold DESC, p.id ASC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(SalesSummary {
            revenue: totals.revenue,
            completed_orders: totals.completed_orders,
            top_products: top
                .into_iter()
                .map(|row| TopProduct {
                    product_id: row.product_id,
                    name: row.name,
                    units_sold: row.units_sold,
                })
                .collect(),
        })
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// Transaction over a [`PgDatabase`]. Dropping it without commit rolls back.
#[derive(Debug)]
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

impl StoreTx for PgTx {
    async fn lock_variant(
        &mut self,
        id: VariantId,
    ) -> Result<Option<VariantSnapshot>, RepositoryError> {
        let row = sqlx::query_as::<_, VariantRow>(&format!("{VARIANT_SELECT} FOR UPDATE OF v"))
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        tracing::debug!(variant_id = %id, found = row.is_some(), "variant row locked");
        Ok(row.map(Into::into))
    }

    async fn write_stock(&mut self, id: VariantId, stock: i32) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE variants SET stock = $2 WHERE id = $1")
            .bind(id)
            .bind(stock)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_customer(&mut self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            "SELECT id, email, name, role FROM customers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn find_design(&mut self, id: DesignId) -> Result<Option<Design>, RepositoryError> {
        let row = sqlx::query_as::<_, DesignRow>(
            "SELECT id, customer_id, name, locations, is_public, final_price
             FROM designs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, RepositoryError> {
        let header = sqlx::query_as::<_, OrderRow>(&format!(
            "INSERT INTO orders (customer_id, total, status)
             VALUES ($1, $2, 'pending')
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.customer_id)
        .bind(order.total)
        .fetch_one(&mut *self.tx)
        .await?;

        if order.items.is_empty() {
            return Ok(header.into_order(Vec::new()));
        }

        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "INSERT INTO order_items (order_id, variant_id, design_id, quantity, unit_price) ",
        );
        builder.push_values(&order.items, |mut row, item| {
            row.push_bind(header.id)
                .push_bind(item.variant_id)
                .push_bind(item.design_id)
                .push_bind(item.quantity)
                .push_bind(item.unit_price);
        });
        builder.push(format!(" RETURNING {ITEM_COLUMNS}"));

        let mut items: Vec<OrderItem> = builder
            .build_query_as::<OrderItemRow>()
            .fetch_all(&mut *self.tx)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        items.sort_by_key(|item| item.id);

        Ok(header.into_order(items))
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let header = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        let Some(header) = header else {
            return Ok(None);
        };
        tracing::debug!(order_id = %id, "order row locked");

        let items = sqlx::query_as::<_, OrderItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id"
        ))
        .bind(id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(Some(
            header.into_order(items.into_iter().map(Into::into).collect()),
        ))
    }

    async fn write_status(&mut self, id: OrderId, status: OrderStatus) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}

// =============================================================================
// Seeding
// =============================================================================

impl CatalogWriter for PgDatabase {
    async fn register_size(&self, name: &str) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO sizes (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn register_color(&self, name: &str, hex: Option<&str>) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO colors (name, hex_code) VALUES ($1, $2)
             ON CONFLICT (name) DO UPDATE
             SET hex_code = COALESCE(EXCLUDED.hex_code, colors.hex_code)",
        )
        .bind(name)
        .bind(hex)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_customer(
        &self,
        email: &Email,
        name: &str,
        role: Role,
    ) -> Result<Customer, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            "INSERT INTO customers (email, name, role) VALUES ($1, $2, $3)
             RETURNING id, email, name, role",
        )
        .bind(email)
        .bind(name)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn insert_product(&self, name: &str, base_price: Money) -> Result<Product, RepositoryError> {
        let id = sqlx::query_scalar::<_, ProductId>(
            "INSERT INTO products (name, base_price) VALUES ($1, $2) RETURNING id",
        )
        .bind(name)
        .bind(base_price)
        .fetch_one(&self.pool)
        .await?;
        Ok(Product {
            id,
            name: name.to_string(),
            base_price,
        })
    }

    async fn insert_variant(
        &self,
        product_id: ProductId,
        size: &str,
        color: &str,
        stock: i32,
        extra_price: Money,
    ) -> Result<VariantSnapshot, RepositoryError> {
        self.register_size(size).await?;
        self.register_color(color, None).await?;

        let id = sqlx::query_scalar::<_, VariantId>(
            r"
            INSERT INTO variants (product_id, size_id, color_id, stock, extra_price)
            SELECT $1, s.id, c.id, $4, $5
            FROM sizes s, colors c
            WHERE s.name = $2 AND c.name = $3
            RETURNING id
            ",
        )
        .bind(product_id)
        .bind(size)
        .bind(color)
        .bind(stock)
        .bind(extra_price)
        .fetch_one(&self.pool)
        .await?;

        self.get_variant(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn insert_design(
        &self,
        customer_id: CustomerId,
        name: &str,
        locations: &[String],
        is_public: bool,
    ) -> Result<Design, RepositoryError> {
        let row = sqlx::query_as::<_, DesignRow>(
            "INSERT INTO designs (customer_id, name, locations, is_public, final_price)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, customer_id, name, locations, is_public, final_price",
        )
        .bind(customer_id)
        .bind(name)
        .bind(locations.to_vec())
        .bind(is_public)
        .bind(pricing::design_base_price(is_public))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }
}
