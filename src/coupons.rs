//! Coupons
//!
//! Cart-level discount descriptors, distinct from the per-line discount
//! rate. A coupon is either relative (a percentage of the cart subtotal)
//! or an absolute amount; an externally supplied list is summed against
//! the subtotal.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a coupon's amount is derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CouponKind {
    /// Percentage of the cart subtotal, 0–100 semantics.
    Relative(Decimal),

    /// Fixed amount.
    Absolute(Decimal),
}

/// A cart-level discount descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    /// Coupon code, for display and bookkeeping.
    pub code: String,

    /// Amount derivation.
    pub kind: CouponKind,
}

impl Coupon {
    /// A percentage-of-subtotal coupon.
    pub fn relative(code: impl Into<String>, rate: Decimal) -> Self {
        Self {
            code: code.into(),
            kind: CouponKind::Relative(rate),
        }
    }

    /// A fixed-amount coupon.
    pub fn absolute(code: impl Into<String>, amount: Decimal) -> Self {
        Self {
            code: code.into(),
            kind: CouponKind::Absolute(amount),
        }
    }
}

/// Sums a coupon list against a cart subtotal.
#[must_use]
pub fn coupon_total(coupons: &[Coupon], subtotal: Decimal) -> Decimal {
    coupons
        .iter()
        .map(|coupon| match coupon.kind {
            CouponKind::Relative(rate) => subtotal * rate / Decimal::ONE_HUNDRED,
            CouponKind::Absolute(amount) => amount,
        })
        .sum()
}
