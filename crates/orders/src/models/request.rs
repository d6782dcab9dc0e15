//! Typed requests accepted by the order core.
//!
//! Raw [`CartItem`]s come from callers (JSON bodies, CLI arguments). They
//! must pass through [`ValidatedCart::new`] before the coordinator will look
//! at them.

use serde::{Deserialize, Serialize};
use stitchworks_core::{CustomerId, DesignId, Role, VariantId};

use crate::error::OrderError;

/// Upper bound on lines in one cart.
pub const MAX_CART_LINES: usize = 100;

/// One requested line as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub variant_id: VariantId,
    pub design_id: DesignId,
    pub quantity: i32,
    /// Print placements for this line; each one past the first is surcharged.
    #[serde(default)]
    pub locations: Vec<String>,
    /// Whether the line uses the public-design discount.
    #[serde(default)]
    pub is_public: bool,
}

/// A cart line that passed validation, remembering its position in the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub position: usize,
    pub variant_id: VariantId,
    pub design_id: DesignId,
    pub quantity: i32,
    pub locations: Vec<String>,
    pub is_public: bool,
}

/// A non-empty cart whose lines all have sane shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCart {
    customer_id: CustomerId,
    lines: Vec<CartLine>,
}

impl ValidatedCart {
    /// Validate raw cart items for `customer_id`.
    ///
    /// Location names are trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Validation`] for an empty cart, more than
    /// [`MAX_CART_LINES`] lines, a quantity below one, or a blank location.
    pub fn new(customer_id: CustomerId, items: Vec<CartItem>) -> Result<Self, OrderError> {
        if items.is_empty() {
            return Err(OrderError::Validation("cart is empty".to_string()));
        }
        if items.len() > MAX_CART_LINES {
            return Err(OrderError::Validation(format!(
                "cart has {} lines, at most {MAX_CART_LINES} allowed",
                items.len()
            )));
        }

        let lines = items
            .into_iter()
            .enumerate()
            .map(|(position, item)| {
                if item.quantity < 1 {
                    return Err(OrderError::Validation(format!(
                        "line {}: quantity must be at least 1, got {}",
                        position + 1,
                        item.quantity
                    )));
                }

                let locations = item
                    .locations
                    .iter()
                    .map(|location| {
                        let trimmed = location.trim();
                        if trimmed.is_empty() {
                            Err(OrderError::Validation(format!(
                                "line {}: location names cannot be blank",
                                position + 1
                            )))
                        } else {
                            Ok(trimmed.to_string())
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(CartLine {
                    position,
                    variant_id: item.variant_id,
                    design_id: item.design_id,
                    quantity: item.quantity,
                    locations,
                    is_public: item.is_public,
                })
            })
            .collect::<Result<Vec<_>, OrderError>>()?;

        Ok(Self { customer_id, lines })
    }

    /// The ordering customer.
    #[must_use]
    pub const fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    /// Lines in cart order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Lines sorted by variant ID (ties keep cart order), the order in which
    /// stock must be reserved.
    #[must_use]
    pub fn lines_in_lock_order(&self) -> Vec<&CartLine> {
        let mut lines: Vec<&CartLine> = self.lines.iter().collect();
        lines.sort_by_key(|line| (line.variant_id, line.position));
        lines
    }
}

/// The authenticated caller, as established by the auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub customer_id: CustomerId,
    pub role: Role,
}

impl Actor {
    /// A regular customer.
    #[must_use]
    pub const fn customer(customer_id: CustomerId) -> Self {
        Self {
            customer_id,
            role: Role::Customer,
        }
    }

    /// A store operator.
    #[must_use]
    pub const fn admin(customer_id: CustomerId) -> Self {
        Self {
            customer_id,
            role: Role::Admin,
        }
    }

    /// Whether this actor may act on something owned by `owner`.
    #[must_use]
    pub fn can_access(&self, owner: CustomerId) -> bool {
        self.role == Role::Admin || self.customer_id == owner
    }
}
