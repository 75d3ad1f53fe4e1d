//! Cart Items
//!
//! The value object for one purchasable cart line: identity, quantity,
//! price, weight, options and per-line tax/discount rates. Row identity
//! is derived from the product identifier and the canonicalized option
//! set, so the same product with different options occupies different
//! rows while repeated adds of an identical line merge.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::{
    buyable::Buyable,
    calculator::{Calculator, Figures},
    catalog::{Catalog, UnknownModelError},
    options::ItemOptions,
    session::Instance,
    shipping::ShippingConfig,
};

/// Opaque product identifier, numeric or textual.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    /// Numeric identifier.
    Number(i64),

    /// Textual identifier, e.g. an SKU.
    Text(String),
}

impl ItemId {
    /// Whether the identifier is empty (only possible for text ids).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            ItemId::Number(_) => false,
            ItemId::Text(text) => text.is_empty(),
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Number(value) => write!(f, "{value}"),
            ItemId::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for ItemId {
    fn from(value: i64) -> Self {
        ItemId::Number(value)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        ItemId::Text(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        ItemId::Text(value)
    }
}

/// Deterministic identity of a cart row.
///
/// A pure function of `(id, canonicalized options)`: equal inputs hash to
/// the same row, and any change to the id or an option value moves the
/// line to a new row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(String);

impl RowId {
    pub(crate) fn compute(id: &ItemId, options: &ItemOptions) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(id.to_string().as_bytes());
        hasher.update(options.canonical().as_bytes());

        Self(format!("{:x}", hasher.finalize()))
    }

    /// The row identity as a hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A construction or quantity precondition was violated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The item identifier is empty.
    #[error("cart item identifier must not be empty")]
    MissingIdentifier,

    /// The item name is empty.
    #[error("cart item name must not be empty")]
    MissingName,

    /// No price was supplied on the attribute-map path.
    #[error("cart item price is required")]
    MissingPrice,

    /// The price is negative.
    #[error("cart item price must not be negative, got {0}")]
    NegativePrice(Decimal),

    /// The weight is negative.
    #[error("cart item weight must not be negative, got {0}")]
    NegativeWeight(Decimal),

    /// The quantity is not a positive number.
    #[error("cart item quantity must be a positive number, got {0}")]
    InvalidQuantity(Decimal),
}

/// Derived-attribute resolution exhausted the calculator and any
/// associated catalog record.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown cart item attribute `{0}`")]
pub struct UnknownAttributeError(pub String);

/// Raw attribute map for building or partially updating a cart line.
///
/// On the add path, `id`, `name` and `price` are required; `qty` defaults
/// to one, `weight` to zero. A supplied `tax_rate`/`discount_rate` is kept
/// instead of the cart's global rate. On the update path every field is
/// optional and merges into the existing line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemAttributes {
    /// Product identifier.
    pub id: Option<ItemId>,

    /// Display name.
    pub name: Option<String>,

    /// Quantity.
    pub qty: Option<Decimal>,

    /// Unit price.
    pub price: Option<Decimal>,

    /// Unit weight.
    pub weight: Option<Decimal>,

    /// Option entries, merged key-by-key on update.
    pub options: Option<ItemOptions>,

    /// Per-line tax rate override.
    pub tax_rate: Option<Decimal>,

    /// Per-line discount rate override.
    pub discount_rate: Option<Decimal>,

    /// Associated catalog model type name.
    pub associated_model: Option<String>,
}

/// One purchasable cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    row_id: RowId,
    id: ItemId,
    name: String,
    qty: Decimal,
    price: Decimal,
    weight: Decimal,
    options: ItemOptions,
    tax_rate: Decimal,
    discount_rate: Decimal,
    associated_model: Option<String>,
    instance: Instance,
}

impl CartItem {
    /// Creates a cart line from explicit fields, with a quantity of one.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the offending field when the
    /// identifier or name is empty, or the price or weight is negative.
    pub fn new(
        id: impl Into<ItemId>,
        name: impl Into<String>,
        price: Decimal,
        weight: Decimal,
        options: ItemOptions,
    ) -> Result<Self, ValidationError> {
        let id = id.into();
        let name = name.into();

        if id.is_empty() {
            return Err(ValidationError::MissingIdentifier);
        }

        if name.is_empty() {
            return Err(ValidationError::MissingName);
        }

        if price < Decimal::ZERO {
            return Err(ValidationError::NegativePrice(price));
        }

        if weight < Decimal::ZERO {
            return Err(ValidationError::NegativeWeight(weight));
        }

        Ok(Self {
            row_id: RowId::compute(&id, &options),
            id,
            name,
            qty: Decimal::ONE,
            price,
            weight,
            options,
            tax_rate: Decimal::ZERO,
            discount_rate: Decimal::ZERO,
            associated_model: None,
            instance: Instance::default(),
        })
    }

    /// Snapshots a [`Buyable`] into a cart line.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the buyable reports an empty
    /// identifier or description, or a negative price or weight.
    pub fn from_buyable(
        buyable: &dyn Buyable,
        options: ItemOptions,
    ) -> Result<Self, ValidationError> {
        let id = buyable.identifier(&options);
        let name = buyable.description(&options);
        let price = buyable.price(&options);
        let weight = buyable.weight(&options);

        Self::new(id, name, price, weight, options)
    }

    /// Builds a cart line from a raw attribute map.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when `id`, `name` or `price` is
    /// absent, or any supplied field fails construction validation.
    pub fn from_attributes(attrs: &ItemAttributes) -> Result<Self, ValidationError> {
        let id = attrs.id.clone().ok_or(ValidationError::MissingIdentifier)?;
        let name = attrs.name.clone().ok_or(ValidationError::MissingName)?;
        let price = attrs.price.ok_or(ValidationError::MissingPrice)?;

        let mut item = Self::new(
            id,
            name,
            price,
            attrs.weight.unwrap_or_default(),
            attrs.options.clone().unwrap_or_default(),
        )?;

        if let Some(qty) = attrs.qty {
            item.set_quantity(qty)?;
        }

        if let Some(rate) = attrs.tax_rate {
            item.tax_rate = rate;
        }

        if let Some(rate) = attrs.discount_rate {
            item.discount_rate = rate;
        }

        // Lookup key only; resolution happens lazily against the catalog.
        item.associated_model.clone_from(&attrs.associated_model);

        Ok(item)
    }

    /// Sets the quantity.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidQuantity`] unless the quantity is
    /// a positive number.
    pub fn set_quantity(&mut self, qty: Decimal) -> Result<(), ValidationError> {
        if qty <= Decimal::ZERO {
            return Err(ValidationError::InvalidQuantity(qty));
        }

        self.qty = qty;

        Ok(())
    }

    /// Merges a partial attribute map into the line, regenerating the row
    /// identity when the id or options changed.
    ///
    /// Quantity is taken as-is here; the cart removes lines whose quantity
    /// drops to zero or below during an update.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when a supplied field is invalid.
    pub(crate) fn apply(&mut self, attrs: &ItemAttributes) -> Result<(), ValidationError> {
        if let Some(id) = &attrs.id {
            if id.is_empty() {
                return Err(ValidationError::MissingIdentifier);
            }

            self.id = id.clone();
        }

        if let Some(name) = &attrs.name {
            if name.is_empty() {
                return Err(ValidationError::MissingName);
            }

            self.name.clone_from(name);
        }

        if let Some(price) = attrs.price {
            if price < Decimal::ZERO {
                return Err(ValidationError::NegativePrice(price));
            }

            self.price = price;
        }

        if let Some(weight) = attrs.weight {
            if weight < Decimal::ZERO {
                return Err(ValidationError::NegativeWeight(weight));
            }

            self.weight = weight;
        }

        if let Some(qty) = attrs.qty {
            self.qty = qty;
        }

        if let Some(options) = &attrs.options {
            for (key, value) in options.iter() {
                self.options.set(key, value.clone());
            }
        }

        if let Some(rate) = attrs.tax_rate {
            self.tax_rate = rate;
        }

        if let Some(rate) = attrs.discount_rate {
            self.discount_rate = rate;
        }

        if attrs.associated_model.is_some() {
            self.associated_model.clone_from(&attrs.associated_model);
        }

        self.refresh_row_id();

        Ok(())
    }

    /// Re-derives identity, name and price from a buyable, keeping the
    /// line's current options.
    pub(crate) fn update_from_buyable(&mut self, buyable: &dyn Buyable) {
        self.id = buyable.identifier(&self.options);
        self.name = buyable.description(&self.options);
        self.price = buyable.price(&self.options);

        self.refresh_row_id();
    }

    pub(crate) fn refresh_row_id(&mut self) {
        self.row_id = RowId::compute(&self.id, &self.options);
    }

    pub(crate) fn set_qty_raw(&mut self, qty: Decimal) {
        self.qty = qty;
    }

    pub(crate) fn set_instance(&mut self, instance: Instance) {
        self.instance = instance;
    }

    /// Associates the line with a catalog model.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownModelError`] when the catalog does not know the
    /// model type name.
    pub fn associate(&mut self, model: &str, catalog: &dyn Catalog) -> Result<(), UnknownModelError> {
        if !catalog.contains_model(model) {
            return Err(UnknownModelError(model.to_string()));
        }

        self.associated_model = Some(model.to_string());

        Ok(())
    }

    /// Row identity of the line.
    #[must_use]
    pub fn row_id(&self) -> &RowId {
        &self.row_id
    }

    /// Product identifier.
    #[must_use]
    pub fn id(&self) -> &ItemId {
        &self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Quantity.
    #[must_use]
    pub fn qty(&self) -> Decimal {
        self.qty
    }

    /// Base unit price before tax and discount.
    #[must_use]
    pub fn price(&self) -> Decimal {
        self.price
    }

    /// Unit weight.
    #[must_use]
    pub fn weight(&self) -> Decimal {
        self.weight
    }

    /// Option entries.
    #[must_use]
    pub fn options(&self) -> &ItemOptions {
        &self.options
    }

    /// Per-line tax rate.
    #[must_use]
    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    /// Per-line discount rate.
    #[must_use]
    pub fn discount_rate(&self) -> Decimal {
        self.discount_rate
    }

    pub(crate) fn set_tax_rate(&mut self, rate: Decimal) {
        self.tax_rate = rate;
    }

    pub(crate) fn set_discount_rate(&mut self, rate: Decimal) {
        self.discount_rate = rate;
    }

    /// Associated catalog model type name, if any.
    #[must_use]
    pub fn associated_model(&self) -> Option<&str> {
        self.associated_model.as_deref()
    }

    /// The cart instance the line currently belongs to.
    #[must_use]
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Calculator inputs for this line.
    #[must_use]
    pub fn figures(&self) -> Figures {
        Figures {
            price: self.price,
            qty: self.qty,
            tax_rate: self.tax_rate,
            discount_rate: self.discount_rate,
        }
    }

    /// Per-unit discount amount.
    pub fn discount(&self, calculator: &dyn Calculator) -> Decimal {
        calculator.discount(&self.figures())
    }

    /// Unit price after discount, before tax.
    pub fn price_target(&self, calculator: &dyn Calculator) -> Decimal {
        calculator.price_target(&self.figures())
    }

    /// Per-unit tax amount.
    pub fn tax(&self, calculator: &dyn Calculator) -> Decimal {
        calculator.tax(&self.figures())
    }

    /// Unit price after discount and tax.
    pub fn price_tax(&self, calculator: &dyn Calculator) -> Decimal {
        calculator.price_tax(&self.figures())
    }

    /// Discounted line price excluding tax.
    pub fn subtotal(&self, calculator: &dyn Calculator) -> Decimal {
        calculator.subtotal(&self.figures())
    }

    /// Line discount amount.
    pub fn discount_total(&self, calculator: &dyn Calculator) -> Decimal {
        calculator.discount_total(&self.figures())
    }

    /// Line tax amount.
    pub fn tax_total(&self, calculator: &dyn Calculator) -> Decimal {
        calculator.tax_total(&self.figures())
    }

    /// Line price including discount and tax.
    pub fn total(&self, calculator: &dyn Calculator) -> Decimal {
        calculator.total(&self.figures())
    }

    /// Line weight.
    #[must_use]
    pub fn weight_total(&self) -> Decimal {
        self.weight * self.qty
    }

    /// Per-unit shipping rate at the standard tier.
    #[must_use]
    pub fn shipping(&self, config: &ShippingConfig) -> Decimal {
        self.price * config.standard_rate
    }

    /// Per-unit shipping rate at the international tier.
    #[must_use]
    pub fn shipping_international(&self, config: &ShippingConfig) -> Decimal {
        self.price * config.international_rate
    }

    /// Resolves a derived attribute by name.
    ///
    /// The calculator is consulted first; an unresolved name falls back to
    /// a same-named field on the associated catalog record.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownAttributeError`] when every source is exhausted.
    pub fn attribute(
        &self,
        name: &str,
        calculator: &dyn Calculator,
        catalog: Option<&dyn Catalog>,
    ) -> Result<Decimal, UnknownAttributeError> {
        if let Some(value) = calculator.resolve(name, &self.figures()) {
            return Ok(value);
        }

        if let (Some(model), Some(catalog)) = (&self.associated_model, catalog) {
            if let Some(record) = catalog.find(model, &self.id) {
                if let Some(value) = record.attributes.get(name) {
                    return Ok(*value);
                }
            }
        }

        Err(UnknownAttributeError(name.to_string()))
    }
}
