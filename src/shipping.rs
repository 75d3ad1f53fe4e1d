//! Shipping
//!
//! Tiered shipping over cart lines: a per-unit rate derived from the line
//! price, multiplied by quantity, with the tier chosen by the
//! jurisdiction code. Rates, the standard-zone list and the exclusion
//! marker are configuration, not constants. Lines whose associated
//! catalog record's title carries the exclusion marker (vouchers, gift
//! cards) ship for free, and an externally flagged free-shipping
//! condition suppresses the sum entirely.

use rust_decimal::Decimal;

use crate::{catalog::Catalog, item::CartItem};

/// Shipping rate and exclusion configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ShippingConfig {
    /// Per-unit rate factor for standard-zone jurisdictions.
    pub standard_rate: Decimal,

    /// Per-unit rate factor for every other jurisdiction.
    pub international_rate: Decimal,

    /// Jurisdiction codes billed at the standard tier. An empty list
    /// treats every jurisdiction as standard.
    pub standard_zones: Vec<String>,

    /// Substring of an associated catalog title that excludes the line
    /// from shipping, matched case-insensitively.
    pub exclusion_marker: String,
}

impl Default for ShippingConfig {
    fn default() -> Self {
        Self {
            standard_rate: Decimal::new(5, 2),
            international_rate: Decimal::new(10, 2),
            standard_zones: Vec::new(),
            exclusion_marker: "voucher".to_string(),
        }
    }
}

/// Per-quote shipping inputs supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShippingContext {
    /// Suppresses the shipping sum entirely.
    pub free_shipping: bool,

    /// Jurisdiction code used for tier selection.
    pub country: Option<String>,
}

/// Which rate tier a jurisdiction falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Standard,
    International,
}

fn tier(config: &ShippingConfig, context: &ShippingContext) -> Tier {
    let Some(country) = &context.country else {
        return Tier::Standard;
    };

    if config.standard_zones.is_empty()
        || config
            .standard_zones
            .iter()
            .any(|zone| zone.eq_ignore_ascii_case(country))
    {
        Tier::Standard
    } else {
        Tier::International
    }
}

fn excluded(item: &CartItem, config: &ShippingConfig, catalog: Option<&dyn Catalog>) -> bool {
    let (Some(model), Some(catalog)) = (item.associated_model(), catalog) else {
        return false;
    };

    catalog
        .find(model, item.id())
        .is_some_and(|record| {
            record
                .title
                .to_lowercase()
                .contains(&config.exclusion_marker.to_lowercase())
        })
}

/// Calculates the shipping total for a set of cart lines.
///
/// Returns zero under the free-shipping flag. Otherwise each non-excluded
/// line contributes `qty * price * rate`, with the rate tier chosen from
/// the jurisdiction code.
#[must_use]
pub fn shipping_total(
    items: &[CartItem],
    config: &ShippingConfig,
    context: &ShippingContext,
    catalog: Option<&dyn Catalog>,
) -> Decimal {
    if context.free_shipping {
        return Decimal::ZERO;
    }

    let tier = tier(config, context);

    items
        .iter()
        .filter(|item| !excluded(item, config, catalog))
        .map(|item| {
            let rate = match tier {
                Tier::Standard => item.shipping(config),
                Tier::International => item.shipping_international(config),
            };

            rate * item.qty()
        })
        .sum()
}
