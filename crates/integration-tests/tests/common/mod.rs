//! Shared fixtures: a small seeded shop on the in-process backend.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use stitchworks_core::{CustomerId, DesignId, Money, OrderStatus, ProductId, Role, VariantId};
use stitchworks_orders::ServiceSettings;
use stitchworks_orders::db::{CatalogWriter, MemoryDatabase};
use stitchworks_orders::models::{CartItem, Order, ValidatedCart};
use stitchworks_orders::services::{Notifier, NotifyError, OrderService, StatusNotice};

/// Records every notice it is given.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<StatusNotice>>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<StatusNotice> {
        self.sent.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<OrderStatus> {
        self.notices().iter().map(|notice| notice.status).collect()
    }
}

impl Notifier for RecordingNotifier {
    async fn notify(&self, notice: &StatusNotice) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notice.clone());
        Ok(())
    }
}

/// Always fails, like an SMTP relay that is down.
#[derive(Debug, Clone, Default)]
pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    async fn notify(&self, _notice: &StatusNotice) -> Result<(), NotifyError> {
        Err(NotifyError::Unavailable("relay down".to_string()))
    }
}

/// Never finishes in time.
#[derive(Debug, Clone, Default)]
pub struct HangingNotifier;

impl Notifier for HangingNotifier {
    async fn notify(&self, _notice: &StatusNotice) -> Result<(), NotifyError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

pub type Service<N> = OrderService<MemoryDatabase, N>;

/// A seeded catalog.
///
/// | name     | product      | base   | extra | stock |
/// |----------|--------------|--------|-------|-------|
/// | `tee`    | Classic Tee  | 15.00  | 0.00  | 5     |
/// | `hoodie` | Heavy Hoodie | 30.00  | 2.50  | 2     |
///
/// `logo` is Ana's private front print, `crest` is Ben's public design.
pub struct Shop<N> {
    pub service: Arc<Service<N>>,
    pub ana: CustomerId,
    pub ben: CustomerId,
    pub admin: CustomerId,
    pub tee_product: ProductId,
    pub tee: VariantId,
    pub hoodie: VariantId,
    pub logo: DesignId,
    pub crest: DesignId,
}

pub async fn shop() -> Shop<RecordingNotifier> {
    shop_with(RecordingNotifier::default(), ServiceSettings::default()).await
}

pub async fn shop_with<N: Notifier>(notifier: N, settings: ServiceSettings) -> Shop<N> {
    let db = MemoryDatabase::new(settings.lock_timeout);

    let admin = db
        .insert_customer(&"admin@stitchworks.test".parse().unwrap(), "Admin", Role::Admin)
        .await
        .unwrap();
    let ana = db
        .insert_customer(&"ana@example.com".parse().unwrap(), "Ana", Role::Customer)
        .await
        .unwrap();
    let ben = db
        .insert_customer(&"ben@example.com".parse().unwrap(), "Ben", Role::Customer)
        .await
        .unwrap();

    let tee_product = db
        .insert_product("Classic Tee", money("15.00"))
        .await
        .unwrap();
    let hoodie_product = db
        .insert_product("Heavy Hoodie", money("30.00"))
        .await
        .unwrap();
    let tee = db
        .insert_variant(tee_product.id, "M", "Blanco", 5, Money::ZERO)
        .await
        .unwrap();
    let hoodie = db
        .insert_variant(hoodie_product.id, "XL", "Negro", 2, money("2.50"))
        .await
        .unwrap();

    let logo = db
        .insert_design(ana.id, "Logo", &["front".to_string()], false)
        .await
        .unwrap();
    let crest = db
        .insert_design(ben.id, "Crest", &["front".to_string()], true)
        .await
        .unwrap();

    Shop {
        service: Arc::new(OrderService::new(db, notifier, &settings)),
        ana: ana.id,
        ben: ben.id,
        admin: admin.id,
        tee_product: tee_product.id,
        tee: tee.id,
        hoodie: hoodie.id,
        logo: logo.id,
        crest: crest.id,
    }
}

impl<N: Notifier> Shop<N> {
    /// Add another tee variant with `stock` units.
    pub async fn add_variant(&self, size: &str, stock: i32) -> VariantId {
        self.service
            .db()
            .insert_variant(self.tee_product, size, "Gris Melange", stock, Money::ZERO)
            .await
            .unwrap()
            .id
    }

    pub async fn stock(&self, id: VariantId) -> i32 {
        self.service.queries().variant(id).await.unwrap().stock
    }

    /// Place an order for Ana using her logo.
    pub async fn order(&self, variant_id: VariantId, quantity: i32) -> Order {
        let cart = cart(self.ana, vec![line(variant_id, self.logo, quantity)]);
        self.service.create_order(&cart).await.unwrap()
    }
}

pub fn money(s: &str) -> Money {
    s.parse().unwrap()
}

/// One line printed on the front only.
pub fn line(variant_id: VariantId, design_id: DesignId, quantity: i32) -> CartItem {
    CartItem {
        variant_id,
        design_id,
        quantity,
        locations: vec!["front".to_string()],
        is_public: false,
    }
}

pub fn cart(customer_id: CustomerId, items: Vec<CartItem>) -> ValidatedCart {
    ValidatedCart::new(customer_id, items).unwrap()
}

/// Settings with a short lock bound so contention tests finish quickly.
pub fn quick_settings() -> ServiceSettings {
    ServiceSettings {
        lock_timeout: Duration::from_millis(100),
        notify_timeout: Duration::from_millis(100),
        ..ServiceSettings::default()
    }
}
