//! The order flows against a real `PostgreSQL` database.
//!
//! Requires `ORDERS_TEST_DATABASE_URL` pointing at a disposable database.
//! Migrations are applied on first use; every test seeds its own customers
//! and variants so runs do not interfere.
//!
//! ```bash
//! ORDERS_TEST_DATABASE_URL=postgres://localhost/stitchworks_test \
//!     cargo test -p stitchworks-integration-tests --test postgres -- --ignored
//! ```

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use common::{RecordingNotifier, cart, line, money};
use secrecy::SecretString;
use stitchworks_core::{CustomerId, DesignId, Money, OrderStatus, Role, VariantId};
use stitchworks_orders::db::{self, CatalogWriter, Database, MIGRATOR, PgDatabase, StoreTx};
use stitchworks_orders::models::Actor;
use stitchworks_orders::{OrderError, OrderService, ServiceSettings};

struct PgShop {
    service: Arc<OrderService<PgDatabase, RecordingNotifier>>,
    customer: CustomerId,
    design: DesignId,
    a: VariantId,
    b: VariantId,
}

async fn pg_shop(stock_a: i32, stock_b: i32) -> PgShop {
    let url = std::env::var("ORDERS_TEST_DATABASE_URL")
        .expect("ORDERS_TEST_DATABASE_URL must be set for PostgreSQL tests");
    let pool = db::create_pool(&SecretString::from(url), 10)
        .await
        .expect("Failed to connect to test database");
    MIGRATOR.run(&pool).await.expect("Failed to run migrations");

    let settings = ServiceSettings {
        lock_timeout: Duration::from_millis(500),
        ..ServiceSettings::default()
    };
    let database = PgDatabase::new(pool, settings.lock_timeout);

    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let customer = database
        .insert_customer(
            &format!("pg-{nonce}@example.com").parse().unwrap(),
            "Pg Tester",
            Role::Customer,
        )
        .await
        .unwrap();
    let product = database
        .insert_product(&format!("Tee {nonce}"), money("15.00"))
        .await
        .unwrap();
    let a = database
        .insert_variant(product.id, "M", "Blanco", stock_a, Money::ZERO)
        .await
        .unwrap();
    let b = database
        .insert_variant(product.id, "L", "Negro", stock_b, Money::ZERO)
        .await
        .unwrap();
    let design = database
        .insert_design(customer.id, "Logo", &["front".to_string()], false)
        .await
        .unwrap();

    PgShop {
        service: Arc::new(OrderService::new(
            database,
            RecordingNotifier::default(),
            &settings,
        )),
        customer: customer.id,
        design: design.id,
        a: a.id,
        b: b.id,
    }
}

impl PgShop {
    async fn stock(&self, id: VariantId) -> i32 {
        self.service.queries().variant(id).await.unwrap().stock
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_pg_rollback_on_insufficient_stock() {
    let shop = pg_shop(5, 2).await;

    let err = shop
        .service
        .create_order(&cart(
            shop.customer,
            vec![line(shop.a, shop.design, 1), line(shop.b, shop.design, 100)],
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::InsufficientStock { variant_id, .. } if variant_id == shop.b));
    assert_eq!(shop.stock(shop.a).await, 5);
    assert_eq!(shop.stock(shop.b).await, 2);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_pg_full_lifecycle() {
    let shop = pg_shop(5, 5).await;
    let order = shop
        .service
        .create_order(&cart(shop.customer, vec![line(shop.a, shop.design, 3)]))
        .await
        .unwrap();
    assert_eq!(order.total, money("45.00"));
    assert_eq!(shop.stock(shop.a).await, 2);

    shop.service
        .transition(order.id, OrderStatus::Paid)
        .await
        .unwrap();
    shop.service
        .transition(order.id, OrderStatus::Shipped)
        .await
        .unwrap();

    let stored = shop.service.queries().order(order.id).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Shipped);
    assert_eq!(stored.total, stored.items_total());
    assert_eq!(shop.stock(shop.a).await, 2);
    assert_eq!(
        shop.service.notifier().statuses(),
        [OrderStatus::Paid, OrderStatus::Shipped]
    );
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_pg_cancel_restores_once() {
    let shop = pg_shop(5, 5).await;
    let order = shop
        .service
        .create_order(&cart(shop.customer, vec![line(shop.a, shop.design, 3)]))
        .await
        .unwrap();

    let actor = Actor::customer(shop.customer);
    shop.service.cancel(order.id, &actor).await.unwrap();
    assert_eq!(shop.stock(shop.a).await, 5);

    assert!(matches!(
        shop.service.cancel(order.id, &actor).await,
        Err(OrderError::IllegalTransition { .. })
    ));
    assert_eq!(shop.stock(shop.a).await, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "Requires PostgreSQL"]
async fn test_pg_racing_orders_for_last_units() {
    let shop = pg_shop(4, 0).await;
    let request = cart(shop.customer, vec![line(shop.a, shop.design, 4)]);

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let service = Arc::clone(&shop.service);
            let request = request.clone();
            tokio::spawn(async move { service.create_order(&request).await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(OrderError::InsufficientStock { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(shop.stock(shop.a).await, 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_pg_lock_timeout_is_busy() {
    let shop = pg_shop(5, 5).await;

    let mut holder = shop.service.db().begin().await.unwrap();
    holder.lock_variant(shop.a).await.unwrap().unwrap();

    let err = shop
        .service
        .create_order(&cart(shop.customer, vec![line(shop.a, shop.design, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Busy));

    drop(holder);
    assert_eq!(shop.stock(shop.a).await, 5);
}
