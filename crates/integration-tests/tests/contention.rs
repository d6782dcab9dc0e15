//! Lock waits are bounded and surface as a retryable `Busy`. Racing
//! transitions on one order are serialised.

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;

use common::{RecordingNotifier, cart, line, quick_settings, shop, shop_with};
use stitchworks_core::OrderStatus;
use stitchworks_orders::OrderError;
use stitchworks_orders::db::{Database, StoreTx};
use stitchworks_orders::models::Actor;

#[tokio::test]
async fn test_locked_variant_makes_order_busy() {
    let shop = shop_with(RecordingNotifier::default(), quick_settings()).await;
    let request = cart(shop.ana, vec![line(shop.tee, shop.logo, 1)]);

    let mut holder = shop.service.db().begin().await.unwrap();
    holder.lock_variant(shop.tee).await.unwrap().unwrap();

    let err = shop.service.create_order(&request).await.unwrap_err();
    assert!(matches!(err, OrderError::Busy));
    assert!(err.is_retryable());

    drop(holder);
    shop.service.create_order(&request).await.unwrap();
    assert_eq!(shop.stock(shop.tee).await, 4);
}

#[tokio::test]
async fn test_locked_order_makes_transition_busy() {
    let shop = shop_with(RecordingNotifier::default(), quick_settings()).await;
    let order = shop.order(shop.tee, 1).await;

    let mut holder = shop.service.db().begin().await.unwrap();
    holder.lock_order(order.id).await.unwrap().unwrap();

    assert!(matches!(
        shop.service.transition(order.id, OrderStatus::Paid).await,
        Err(OrderError::Busy)
    ));

    drop(holder);
    let paid = shop
        .service
        .transition(order.id, OrderStatus::Paid)
        .await
        .unwrap();
    assert_eq!(paid.status, OrderStatus::Paid);
}

#[tokio::test]
async fn test_abandoned_transaction_leaves_no_trace() {
    let shop = shop_with(RecordingNotifier::default(), quick_settings()).await;

    {
        let mut tx = shop.service.db().begin().await.unwrap();
        tx.lock_variant(shop.tee).await.unwrap().unwrap();
        tx.write_stock(shop.tee, 0).await.unwrap();
    }

    assert_eq!(shop.stock(shop.tee).await, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pay_and_cancel_race_has_one_winner() {
    for _ in 0..20 {
        let shop = shop().await;
        let order_id = shop.order(shop.tee, 3).await.id;
        let owner = Actor::customer(shop.ana);

        let pay = tokio::spawn({
            let service = Arc::clone(&shop.service);
            async move { service.transition(order_id, OrderStatus::Paid).await }
        });
        let cancel = tokio::spawn({
            let service = Arc::clone(&shop.service);
            async move { service.cancel(order_id, &owner).await }
        });
        let paid = pay.await.unwrap();
        let cancelled = cancel.await.unwrap();

        assert_ne!(paid.is_ok(), cancelled.is_ok());
        let loser = match (&paid, &cancelled) {
            (Err(err), Ok(_)) | (Ok(_), Err(err)) => err,
            _ => unreachable!(),
        };
        assert!(
            matches!(loser, OrderError::IllegalTransition { .. } | OrderError::Busy),
            "unexpected error: {loser:?}"
        );

        let stored = shop.service.queries().order(order_id).await.unwrap();
        if paid.is_ok() {
            assert_eq!(stored.status, OrderStatus::Paid);
            assert_eq!(shop.stock(shop.tee).await, 2);
        } else {
            assert_eq!(stored.status, OrderStatus::Cancelled);
            assert_eq!(shop.stock(shop.tee).await, 5);
        }
    }
}
