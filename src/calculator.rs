//! Calculators
//!
//! Pluggable strategies for deriving the monetary fields of a cart line
//! from its base price, quantity, tax rate and discount rate.
//!
//! Implementations supply the per-unit [`discount`](Calculator::discount)
//! and [`tax`](Calculator::tax) amounts; the remaining attributes are
//! provided in terms of those two and must keep the relations
//! `price_target = price - discount`, `price_tax = price_target + tax` and
//! `total = price_tax * qty = subtotal + tax_total`.

use std::fmt;

use rust_decimal::Decimal;

/// The per-line inputs a calculator derives amounts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Figures {
    /// Base unit price before tax and discount.
    pub price: Decimal,

    /// Line quantity.
    pub qty: Decimal,

    /// Tax rate, 0–100 semantics.
    pub tax_rate: Decimal,

    /// Discount rate, 0–100 semantics.
    pub discount_rate: Decimal,
}

/// A derived-amount strategy for cart lines.
pub trait Calculator: fmt::Debug {
    /// Per-unit discount amount, never negative.
    fn discount(&self, figures: &Figures) -> Decimal;

    /// Per-unit tax amount, computed on the discounted price.
    fn tax(&self, figures: &Figures) -> Decimal;

    /// Unit price after discount, before tax.
    fn price_target(&self, figures: &Figures) -> Decimal {
        (figures.price - self.discount(figures)).max(Decimal::ZERO)
    }

    /// Unit price after discount and tax.
    fn price_tax(&self, figures: &Figures) -> Decimal {
        self.price_target(figures) + self.tax(figures)
    }

    /// Discounted line price excluding tax.
    fn subtotal(&self, figures: &Figures) -> Decimal {
        self.price_target(figures) * figures.qty
    }

    /// Line discount amount.
    fn discount_total(&self, figures: &Figures) -> Decimal {
        self.discount(figures) * figures.qty
    }

    /// Line tax amount.
    fn tax_total(&self, figures: &Figures) -> Decimal {
        self.tax(figures) * figures.qty
    }

    /// Line price including discount and tax.
    fn total(&self, figures: &Figures) -> Decimal {
        self.price_tax(figures) * figures.qty
    }

    /// Resolves a derived attribute by name.
    ///
    /// Returns `None` for names this calculator does not compute; callers
    /// fall back to other sources or surface an unknown-attribute error.
    fn resolve(&self, attribute: &str, figures: &Figures) -> Option<Decimal> {
        match attribute {
            "discount" => Some(self.discount(figures)),
            "tax" => Some(self.tax(figures)),
            "price_target" => Some(self.price_target(figures)),
            "price_tax" => Some(self.price_tax(figures)),
            "subtotal" => Some(self.subtotal(figures)),
            "discount_total" => Some(self.discount_total(figures)),
            "tax_total" => Some(self.tax_total(figures)),
            "total" | "price_total" => Some(self.total(figures)),
            _ => None,
        }
    }
}

/// The stock calculator: plain percentage discount and tax, exact
/// arithmetic, no intermediate rounding.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCalculator;

impl Calculator for DefaultCalculator {
    fn discount(&self, figures: &Figures) -> Decimal {
        (figures.price * figures.discount_rate / Decimal::ONE_HUNDRED).max(Decimal::ZERO)
    }

    fn tax(&self, figures: &Figures) -> Decimal {
        (self.price_target(figures) * figures.tax_rate / Decimal::ONE_HUNDRED).max(Decimal::ZERO)
    }
}
