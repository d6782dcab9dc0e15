//! Order state machine: every (from, to) pair, stock effects and notices.

#![allow(clippy::unwrap_used)]

mod common;

use common::{RecordingNotifier, Shop, shop};
use stitchworks_core::{OrderId, OrderStatus, VariantId};
use stitchworks_orders::{OrderError, Resource};

const LEGAL: [(OrderStatus, OrderStatus); 3] = [
    (OrderStatus::Pending, OrderStatus::Paid),
    (OrderStatus::Pending, OrderStatus::Cancelled),
    (OrderStatus::Paid, OrderStatus::Shipped),
];

/// Create an order of two units and walk it to `status`.
async fn order_in(shop: &Shop<RecordingNotifier>, variant: VariantId, status: OrderStatus) -> OrderId {
    let order = shop.order(variant, 2).await;
    let path: &[OrderStatus] = match status {
        OrderStatus::Pending => &[],
        OrderStatus::Paid => &[OrderStatus::Paid],
        OrderStatus::Shipped => &[OrderStatus::Paid, OrderStatus::Shipped],
        OrderStatus::Cancelled => &[OrderStatus::Cancelled],
    };
    for step in path {
        shop.service.transition(order.id, *step).await.unwrap();
    }
    order.id
}

#[tokio::test]
async fn test_every_status_pair() {
    let shop = shop().await;
    let variant = shop.add_variant("L", 100).await;

    for from in OrderStatus::ALL {
        for to in OrderStatus::ALL {
            let id = order_in(&shop, variant, from).await;
            let stock_before = shop.stock(variant).await;
            let result = shop.service.transition(id, to).await;
            let stored = shop.service.queries().order(id).await.unwrap().status;

            if LEGAL.contains(&(from, to)) {
                let order = result.unwrap();
                assert_eq!(order.status, to, "{from} -> {to}");
                assert_eq!(stored, to, "{from} -> {to}");
            } else {
                match result {
                    Err(OrderError::IllegalTransition { from: f, to: t }) => {
                        assert_eq!((f, t), (from, to));
                    }
                    other => panic!("{from} -> {to}: expected IllegalTransition, got {other:?}"),
                }
                assert_eq!(stored, from, "{from} -> {to}");
                assert_eq!(shop.stock(variant).await, stock_before, "{from} -> {to}");
            }
        }
    }
}

#[tokio::test]
async fn test_payment_does_not_decrement_again() {
    let shop = shop().await;
    let order = shop.order(shop.tee, 3).await;
    assert_eq!(shop.stock(shop.tee).await, 2);

    shop.service
        .transition(order.id, OrderStatus::Paid)
        .await
        .unwrap();
    shop.service
        .transition(order.id, OrderStatus::Shipped)
        .await
        .unwrap();

    assert_eq!(shop.stock(shop.tee).await, 2);
}

#[tokio::test]
async fn test_cancel_transition_restores_stock() {
    let shop = shop().await;
    let order = shop.order(shop.tee, 3).await;

    shop.service
        .transition(order.id, OrderStatus::Cancelled)
        .await
        .unwrap();

    assert_eq!(shop.stock(shop.tee).await, 5);
}

#[tokio::test]
async fn test_each_transition_notifies_owner() {
    let shop = shop().await;
    let order = shop.order(shop.tee, 1).await;

    shop.service
        .transition(order.id, OrderStatus::Paid)
        .await
        .unwrap();
    shop.service
        .transition(order.id, OrderStatus::Shipped)
        .await
        .unwrap();
    let _ = shop.service.transition(order.id, OrderStatus::Paid).await;

    let notices = shop.service.notifier().notices();
    assert_eq!(notices.len(), 2);
    assert_eq!(notices[0].status, OrderStatus::Paid);
    assert_eq!(notices[1].status, OrderStatus::Shipped);
    assert!(notices.iter().all(|n| n.order_id == order.id));
    assert!(notices.iter().all(|n| n.email.as_str() == "ana@example.com"));
    assert_eq!(notices[1].status_label(), "SHIPPED");
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let shop = shop().await;

    let err = shop
        .service
        .transition(OrderId::new(999), OrderStatus::Paid)
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::NotFound(Resource::Order(id)) if id == OrderId::new(999)));
    assert!(shop.service.notifier().notices().is_empty());
}
