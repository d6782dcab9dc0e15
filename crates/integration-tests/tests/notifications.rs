//! Notification delivery is best effort: a broken or slow channel never
//! fails or rolls back a committed status change.

#![allow(clippy::unwrap_used)]

mod common;

use std::time::Duration;

use common::{FailingNotifier, HangingNotifier, quick_settings, shop_with};
use stitchworks_core::OrderStatus;
use stitchworks_orders::ServiceSettings;
use stitchworks_orders::models::Actor;

#[tokio::test]
async fn test_failed_delivery_keeps_transition() {
    let shop = shop_with(FailingNotifier, ServiceSettings::default()).await;
    let order = shop.order(shop.tee, 1).await;

    let paid = shop
        .service
        .transition(order.id, OrderStatus::Paid)
        .await
        .unwrap();

    assert_eq!(paid.status, OrderStatus::Paid);
    assert_eq!(
        shop.service.queries().order(order.id).await.unwrap().status,
        OrderStatus::Paid
    );
}

#[tokio::test]
async fn test_failed_delivery_keeps_cancellation() {
    let shop = shop_with(FailingNotifier, ServiceSettings::default()).await;
    let order = shop.order(shop.tee, 2).await;

    let ack = shop
        .service
        .cancel(order.id, &Actor::customer(shop.ana))
        .await
        .unwrap();

    assert!(!ack.notified);
    assert_eq!(ack.restored_units, 2);
    assert_eq!(shop.stock(shop.tee).await, 5);
}

#[tokio::test]
async fn test_slow_delivery_is_bounded() {
    let shop = shop_with(HangingNotifier, quick_settings()).await;
    let order = shop.order(shop.tee, 1).await;

    let ack = tokio::time::timeout(
        Duration::from_secs(5),
        shop.service.cancel(order.id, &Actor::customer(shop.ana)),
    )
    .await
    .expect("cancel should not wait for the notifier")
    .unwrap();

    assert!(!ack.notified);
    assert_eq!(
        shop.service.queries().order(order.id).await.unwrap().status,
        OrderStatus::Cancelled
    );
}
