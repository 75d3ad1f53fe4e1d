//! Configuration
//!
//! Explicit configuration passed into the cart at construction time —
//! defaults are never read from ambient state. Display formatting is a
//! value too, so callers can override decimals and separators per call.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::shipping::ShippingConfig;

/// Locale-style number formatting for monetary display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    /// Number of decimal places rendered.
    pub decimals: u32,

    /// Decimal point string.
    pub decimal_point: String,

    /// Thousands separator string.
    pub thousands_separator: String,
}

impl Default for Format {
    fn default() -> Self {
        Self {
            decimals: 2,
            decimal_point: ".".to_string(),
            thousands_separator: ",".to_string(),
        }
    }
}

impl Format {
    /// Overrides the number of decimal places.
    #[must_use]
    pub fn decimals(mut self, decimals: u32) -> Self {
        self.decimals = decimals;
        self
    }

    /// Overrides the decimal point.
    #[must_use]
    pub fn decimal_point(mut self, point: impl Into<String>) -> Self {
        self.decimal_point = point.into();
        self
    }

    /// Overrides the thousands separator.
    #[must_use]
    pub fn thousands_separator(mut self, separator: impl Into<String>) -> Self {
        self.thousands_separator = separator.into();
        self
    }

    /// Renders an amount with this format.
    ///
    /// Rounds to the configured decimal places, midpoint away from zero,
    /// and groups the integer digits in threes.
    #[must_use]
    pub fn render(&self, amount: Decimal) -> String {
        let rounded = amount
            .round_dp_with_strategy(self.decimals, RoundingStrategy::MidpointAwayFromZero);
        let negative = rounded.is_sign_negative() && !rounded.is_zero();

        let plain = format!("{:.prec$}", rounded.abs(), prec = self.decimals as usize);
        let plain_len = plain.len();
        let (int_part, frac_part) = match plain.split_once('.') {
            Some((int_part, frac_part)) => (int_part.to_string(), Some(frac_part.to_string())),
            None => (plain, None),
        };

        let digits: Vec<char> = int_part.chars().collect();
        let mut out = String::with_capacity(plain_len + digits.len() / 3 + 1);

        if negative {
            out.push('-');
        }

        for (index, digit) in digits.iter().enumerate() {
            if index != 0 && (digits.len() - index) % 3 == 0 {
                out.push_str(&self.thousands_separator);
            }

            out.push(*digit);
        }

        if let Some(frac_part) = frac_part {
            out.push_str(&self.decimal_point);
            out.push_str(&frac_part);
        }

        out
    }
}

/// Cart-wide configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CartConfig {
    /// Tax rate applied to newly added lines, 0–100 semantics.
    pub default_tax_rate: Decimal,

    /// Discount rate applied to newly added lines, 0–100 semantics.
    pub default_discount_rate: Decimal,

    /// Default display formatting.
    pub format: Format,

    /// Shipping rates, zones and exclusions.
    pub shipping: ShippingConfig,
}
