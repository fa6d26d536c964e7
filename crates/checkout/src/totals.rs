//! Pure order-total computation.
//!
//! Totals are derived from the current cart subtotal on every evaluation and
//! never cached, so a cart changed in another session can't leave stale money
//! math behind. Tax is charged on the subtotal only (not on shipping) and
//! rounded half-up to the nearest whole currency unit, matching the backend.

use kasuwa_core::Money;
use rust_decimal::{Decimal, RoundingStrategy};

/// Orders at or above this subtotal ship free. Exactly meeting the threshold
/// qualifies.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Flat delivery fee below the free-shipping threshold.
pub const FLAT_SHIPPING_FEE: Decimal = Decimal::from_parts(1_500, 0, 0, false, 0);

/// VAT rate applied to the subtotal (7.5%).
pub const TAX_RATE: Decimal = Decimal::from_parts(75, 0, 0, false, 3);

/// Display totals for the checkout summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    /// The cart's aggregate amount.
    pub subtotal: Money,
    /// Delivery fee (zero at or above the free-shipping threshold).
    pub shipping: Money,
    /// Tax on the subtotal, rounded half-up to a whole unit.
    pub tax: Money,
    /// `subtotal + shipping + tax`.
    pub total: Money,
}

impl Totals {
    /// Derive totals from a cart subtotal.
    #[must_use]
    pub fn from_subtotal(subtotal: Money) -> Self {
        let amount = subtotal.amount();
        let shipping = if amount >= FREE_SHIPPING_THRESHOLD {
            Decimal::ZERO
        } else {
            FLAT_SHIPPING_FEE
        };
        let tax = (amount * TAX_RATE)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

        Self {
            subtotal,
            shipping: subtotal.with_amount(shipping),
            tax: subtotal.with_amount(tax),
            total: subtotal.with_amount(amount + shipping + tax),
        }
    }

    /// Whether the order qualified for free shipping.
    #[must_use]
    pub fn free_shipping(&self) -> bool {
        self.shipping.is_zero()
    }
}
