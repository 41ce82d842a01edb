//! Shipping fee rules.

use crate::money::Money;

/// Orders at or above this subtotal ship free.
pub const FREE_SHIPPING_THRESHOLD: Money = Money::from_cents(50_000);

/// Flat fee applied below the free-shipping threshold.
pub const DEFAULT_FEE: Money = Money::from_cents(3_000);

/// Returns the shipping fee for a subtotal.
pub fn shipping_fee_for(subtotal: Money) -> Money {
    if subtotal >= FREE_SHIPPING_THRESHOLD {
        Money::zero()
    } else {
        DEFAULT_FEE
    }
}
