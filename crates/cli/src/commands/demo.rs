//! In-memory walkthrough of the order flows.
//!
//! Seeds the bundled catalog into a [`MemoryDatabase`], then runs
//! create -> pay -> ship for one customer and create -> cancel for another,
//! printing stock before and after each step.

use stitchworks_core::{OrderStatus, VariantId};
use stitchworks_orders::ServiceSettings;
use stitchworks_orders::db::MemoryDatabase;
use stitchworks_orders::models::{Actor, CartItem, ValidatedCart};
use stitchworks_orders::services::{LogNotifier, OrderService};

use super::CliResult;
use super::seed::{CatalogFile, apply};

const CATALOG: &str = include_str!("../../seed/catalog.yaml");

type DemoService = OrderService<MemoryDatabase, LogNotifier>;

#[allow(clippy::print_stdout)]
async fn print_stock(service: &DemoService, step: &str, variants: &[VariantId]) -> CliResult {
    println!("-- {step}");
    for id in variants {
        let variant = service.queries().variant(*id).await?;
        println!("   {:<40} stock {}", variant.label(), variant.stock);
    }
    Ok(())
}

/// Run the demo.
///
/// # Errors
///
/// Returns an error if the bundled catalog is invalid or a step fails.
pub async fn run() -> CliResult {
    let settings = ServiceSettings::default();
    let db = MemoryDatabase::new(settings.lock_timeout);
    let report = apply(&db, &CatalogFile::parse(CATALOG)?).await?;
    let service = OrderService::new(db, LogNotifier, &settings);

    let ana = report
        .customer_id("ana@example.com")
        .ok_or("bundled catalog has no ana@example.com")?;
    let ben = report
        .customer_id("ben@example.com")
        .ok_or("bundled catalog has no ben@example.com")?;
    let (Some(anas_design), Some(bens_design)) = (report.designs.first(), report.designs.get(1))
    else {
        return Err("bundled catalog needs two designs".into());
    };
    let (Some(tee), Some(hoodie)) = (report.variants.first(), report.variants.get(3)) else {
        return Err("bundled catalog needs at least four variants".into());
    };
    let watched = [tee.id, hoodie.id];

    print_stock(&service, "initial stock", &watched).await?;

    let cart = ValidatedCart::new(
        ana,
        vec![
            CartItem {
                variant_id: tee.id,
                design_id: anas_design.id,
                quantity: 2,
                locations: anas_design.locations.clone(),
                is_public: anas_design.is_public,
            },
            CartItem {
                variant_id: hoodie.id,
                design_id: anas_design.id,
                quantity: 1,
                locations: vec!["front".to_string()],
                is_public: false,
            },
        ],
    )?;
    let order = service.create_order(&cart).await?;
    print_stock(&service, &format!("order {} created, total {}", order.id, order.total), &watched)
        .await?;

    service.transition(order.id, OrderStatus::Paid).await?;
    service.transition(order.id, OrderStatus::Shipped).await?;
    print_stock(&service, &format!("order {} paid and shipped", order.id), &watched).await?;

    let cart = ValidatedCart::new(
        ben,
        vec![CartItem {
            variant_id: hoodie.id,
            design_id: bens_design.id,
            quantity: 2,
            locations: bens_design.locations.clone(),
            is_public: false,
        }],
    )?;
    let order = service.create_order(&cart).await?;
    print_stock(&service, &format!("order {} created, total {}", order.id, order.total), &watched)
        .await?;

    let ack = service.cancel(order.id, &Actor::customer(ben)).await?;
    print_stock(
        &service,
        &format!("order {} cancelled, {} units restored", ack.order_id, ack.restored_units),
        &watched,
    )
    .await?;

    let summary = service.queries().sales_summary().await?;
    #[allow(clippy::print_stdout)]
    {
        println!(
            "-- revenue {} over {} completed order(s)",
            summary.revenue, summary.completed_orders
        );
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_runs_to_completion() {
        run().await.unwrap();
    }
}
