//! Order commands.
//!
//! # Usage
//!
//! ```bash
//! sw-cli order create --customer 2 --item 1:1:2 --item 4:2:1:public:front,back
//! sw-cli order pay 1
//! sw-cli order ship 1
//! sw-cli order cancel 2 --as 2
//! sw-cli order cancel 3 --as 1 --admin
//! sw-cli order show 1
//! sw-cli order list --customer 2
//! sw-cli stats
//! ```
//!
//! Results are printed to stdout as JSON; progress goes to the log.

use stitchworks_core::{CustomerId, DesignId, OrderId, OrderStatus, VariantId};
use stitchworks_orders::models::{Actor, CartItem, ValidatedCart};

use super::{CliResult, print_json, service};

/// Parse a cart line written as `<variant>:<design>:<qty>[:public][:loc1,loc2]`.
///
/// The optional parts may come in either order. Without a location list the
/// line is printed on the front only.
///
/// # Errors
///
/// Returns a message naming the malformed part.
pub fn parse_item(raw: &str) -> Result<CartItem, String> {
    let mut parts = raw.split(':');
    let mut next_id = |name: &str| -> Result<i32, String> {
        let part = parts
            .next()
            .ok_or_else(|| format!("missing {name} in '{raw}'"))?;
        part.trim()
            .parse::<i32>()
            .map_err(|_| format!("invalid {name} '{part}' in '{raw}'"))
    };

    let variant_id = VariantId::new(next_id("variant")?);
    let design_id = DesignId::new(next_id("design")?);
    let quantity = next_id("quantity")?;

    let mut is_public = false;
    let mut locations = None;
    for part in parts {
        match part.trim() {
            "public" if !is_public => is_public = true,
            list if locations.is_none() && !list.is_empty() && list != "public" => {
                locations = Some(list.split(',').map(str::to_string).collect());
            }
            other => return Err(format!("unexpected '{other}' in '{raw}'")),
        }
    }

    Ok(CartItem {
        variant_id,
        design_id,
        quantity,
        locations: locations.unwrap_or_else(|| vec!["front".to_string()]),
        is_public,
    })
}

/// Create an order for `customer_id`.
///
/// # Errors
///
/// Returns an error if the cart is invalid or the order is rejected.
pub async fn create(customer_id: CustomerId, items: Vec<CartItem>) -> CliResult {
    let cart = ValidatedCart::new(customer_id, items)?;
    let service = service().await?;

    let order = service.create_order(&cart).await?;
    print_json(&order)
}

/// Move an order to `target`.
///
/// # Errors
///
/// Returns an error if the transition is rejected.
pub async fn transition(order_id: OrderId, target: OrderStatus) -> CliResult {
    let service = service().await?;

    let order = service.transition(order_id, target).await?;
    print_json(&order)
}

/// Cancel an order on behalf of `actor_id`.
///
/// # Errors
///
/// Returns an error if the cancellation is rejected.
pub async fn cancel(order_id: OrderId, actor_id: CustomerId, admin: bool) -> CliResult {
    let actor = if admin {
        Actor::admin(actor_id)
    } else {
        Actor::customer(actor_id)
    };
    let service = service().await?;

    let ack = service.cancel(order_id, &actor).await?;
    tracing::info!(
        order_id = %ack.order_id,
        restored_units = ack.restored_units,
        notified = ack.notified,
        "Cancellation complete"
    );
    let order = service.queries().order(order_id).await?;
    print_json(&order)
}

/// Print one order.
///
/// # Errors
///
/// Returns an error if the order does not exist.
pub async fn show(order_id: OrderId) -> CliResult {
    let service = service().await?;
    let order = service.queries().order(order_id).await?;
    print_json(&order)
}

/// Print orders, newest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn list(customer_id: Option<CustomerId>) -> CliResult {
    let service = service().await?;
    let queries = service.queries();
    let orders = match customer_id {
        Some(id) => queries.orders_for_customer(id).await?,
        None => queries.all_orders().await?,
    };
    tracing::info!(count = orders.len(), "Orders loaded");
    print_json(&orders)
}

/// Print revenue and best sellers.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn stats() -> CliResult {
    let service = service().await?;
    let summary = service.queries().sales_summary().await?;
    print_json(&summary)
}
