//! Line-item pricing for customised garments.
//!
//! A printed garment costs its variant's base price plus a flat surcharge for
//! every print location beyond the first. Designs shared publicly get a
//! discount on the whole amount. The result is rounded half-up to cents.

use rust_decimal::Decimal;

use crate::Money;

/// Surcharge for each print location beyond the first (5.00).
pub const LOCATION_SURCHARGE: Money = Money::from_cents_const(500);

/// Fraction taken off the price of public designs (10%).
pub const PUBLIC_DISCOUNT: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Base customisation price charged when a design is created (15.00).
pub const DESIGN_BASE_PRICE: Money = Money::from_cents_const(1_500);

/// Compute a unit price.
///
/// `base + extra_locations * LOCATION_SURCHARGE`, then `* (1 - PUBLIC_DISCOUNT)`
/// when `is_public`.
///
/// ```
/// use stitchworks_core::{pricing, Money};
///
/// let base = Money::from_cents(1_500).unwrap();
/// assert_eq!(pricing::compute_price(base, 1, false).to_string(), "20.00");
/// assert_eq!(pricing::compute_price(base, 1, true).to_string(), "18.00");
/// ```
#[must_use]
pub fn compute_price(base: Money, extra_locations: u32, is_public: bool) -> Money {
    let surcharge = LOCATION_SURCHARGE.amount() * Decimal::from(extra_locations);
    let price = Money::new(base.amount() + surcharge).unwrap_or(base);

    if is_public {
        price.scale(Decimal::ONE - PUBLIC_DISCOUNT)
    } else {
        price
    }
}

/// Number of surcharged locations for a design printed on `location_count`
/// places. The first location is included in the base price.
#[must_use]
pub const fn extra_locations(location_count: usize) -> u32 {
    let extra = location_count.saturating_sub(1);
    if extra > u32::MAX as usize {
        u32::MAX
    } else {
        #[allow(clippy::cast_possible_truncation)]
        {
            extra as u32
        }
    }
}

/// Price assigned to a newly created design: the design base price with a
/// single placement.
#[must_use]
pub fn design_base_price(is_public: bool) -> Money {
    compute_price(DESIGN_BASE_PRICE, 0, is_public)
}
