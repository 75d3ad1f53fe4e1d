//! Cart
//!
//! The aggregate owning the ordered line collection for one
//! `(session, instance)` pair. Mutations write the full content back to
//! the session slot and publish lifecycle events; the persistence
//! protocol (store/restore/merge/erase) moves snapshots through the
//! storage gateway. All collaborators are injected at construction.

use std::fmt;

use jiff::Timestamp;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::{
    buyable::{Buyable, InstanceIdentifier},
    calculator::{Calculator, DefaultCalculator},
    catalog::{Catalog, UnknownModelError},
    config::{CartConfig, Format},
    coupons::{Coupon, coupon_total},
    events::{CartEvent, EventBus, NoopEventBus},
    item::{CartItem, ItemAttributes, ItemId, RowId, UnknownAttributeError, ValidationError},
    memory::{MemorySessionStore, MemoryStorageGateway},
    options::ItemOptions,
    session::{Instance, SessionStore},
    shipping::{ShippingContext, shipping_total},
    storage::{CartSnapshot, StorageGateway, StoredCart},
};

/// Errors surfaced by cart operations.
///
/// Every failure is a deterministic precondition violation; nothing is
/// retried internally.
#[derive(Debug, Error, PartialEq)]
pub enum CartError {
    /// A line failed construction or quantity validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No line exists under the row identity.
    #[error("cart row `{0}` does not exist")]
    InvalidRowId(RowId),

    /// The association target model is unknown.
    #[error(transparent)]
    UnknownModel(#[from] UnknownModelError),

    /// A record already exists for the identifier and instance.
    #[error("a cart is already stored under identifier `{identifier}` for instance `{instance}`")]
    AlreadyStored {
        /// The identifier the store was attempted under.
        identifier: String,

        /// The instance the store was attempted from.
        instance: Instance,
    },

    /// Derived-attribute resolution exhausted all sources.
    #[error(transparent)]
    UnknownAttribute(#[from] UnknownAttributeError),
}

/// Specification of a line to add.
pub enum ItemSpec<'a> {
    /// Snapshot a buyable catalog entity.
    Buyable {
        /// The entity to snapshot.
        buyable: &'a dyn Buyable,

        /// Quantity to add.
        qty: Decimal,

        /// Chosen options.
        options: ItemOptions,
    },

    /// Build from a raw attribute map. A supplied tax or discount rate is
    /// kept instead of the cart's global rate.
    Attributes(ItemAttributes),

    /// Build from explicit fields.
    Explicit {
        /// Product identifier.
        id: ItemId,

        /// Display name.
        name: String,

        /// Quantity to add.
        qty: Decimal,

        /// Unit price.
        price: Decimal,

        /// Unit weight.
        weight: Decimal,

        /// Chosen options.
        options: ItemOptions,
    },
}

impl<'a> ItemSpec<'a> {
    /// Specifies a buyable with no options.
    pub fn buyable(buyable: &'a dyn Buyable, qty: Decimal) -> Self {
        Self::buyable_with_options(buyable, qty, ItemOptions::new())
    }

    /// Specifies a buyable with options.
    pub fn buyable_with_options(
        buyable: &'a dyn Buyable,
        qty: Decimal,
        options: ItemOptions,
    ) -> Self {
        ItemSpec::Buyable {
            buyable,
            qty,
            options,
        }
    }

    /// Specifies explicit fields with no options.
    pub fn explicit(
        id: impl Into<ItemId>,
        name: impl Into<String>,
        qty: Decimal,
        price: Decimal,
        weight: Decimal,
    ) -> Self {
        Self::explicit_with_options(id, name, qty, price, weight, ItemOptions::new())
    }

    /// Specifies explicit fields with options.
    pub fn explicit_with_options(
        id: impl Into<ItemId>,
        name: impl Into<String>,
        qty: Decimal,
        price: Decimal,
        weight: Decimal,
        options: ItemOptions,
    ) -> Self {
        ItemSpec::Explicit {
            id: id.into(),
            name: name.into(),
            qty,
            price,
            weight,
            options,
        }
    }
}

impl fmt::Debug for ItemSpec<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemSpec::Buyable { qty, options, .. } => f
                .debug_struct("Buyable")
                .field("qty", qty)
                .field("options", options)
                .finish_non_exhaustive(),
            ItemSpec::Attributes(attrs) => f.debug_tuple("Attributes").field(attrs).finish(),
            ItemSpec::Explicit { id, name, qty, .. } => f
                .debug_struct("Explicit")
                .field("id", id)
                .field("name", name)
                .field("qty", qty)
                .finish_non_exhaustive(),
        }
    }
}

/// A change applied to an existing line.
pub enum UpdateSpec<'a> {
    /// Re-derive identity, name and price from a buyable.
    Buyable(&'a dyn Buyable),

    /// Merge a partial attribute map.
    Attributes(ItemAttributes),

    /// Replace the quantity. Zero or below removes the line.
    Qty(Decimal),
}

impl fmt::Debug for UpdateSpec<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateSpec::Buyable(_) => f.debug_tuple("Buyable").finish_non_exhaustive(),
            UpdateSpec::Attributes(attrs) => f.debug_tuple("Attributes").field(attrs).finish(),
            UpdateSpec::Qty(qty) => f.debug_tuple("Qty").field(qty).finish(),
        }
    }
}

/// Builder assembling a [`Cart`] with its injected collaborators.
///
/// Unset collaborators default to the in-memory implementations, a noop
/// event bus and the stock calculator.
#[derive(Debug, Default)]
pub struct CartBuilder {
    instance: Instance,
    config: CartConfig,
    calculator: Option<Box<dyn Calculator>>,
    session: Option<Box<dyn SessionStore>>,
    events: Option<Box<dyn EventBus>>,
    gateway: Option<Box<dyn StorageGateway>>,
    catalog: Option<Box<dyn Catalog>>,
}

impl CartBuilder {
    /// Names the cart instance.
    #[must_use]
    pub fn instance(mut self, instance: impl Into<Instance>) -> Self {
        self.instance = instance.into();
        self
    }

    /// Supplies the cart configuration.
    #[must_use]
    pub fn config(mut self, config: CartConfig) -> Self {
        self.config = config;
        self
    }

    /// Selects the derived-amount calculator.
    #[must_use]
    pub fn calculator(mut self, calculator: impl Calculator + 'static) -> Self {
        self.calculator = Some(Box::new(calculator));
        self
    }

    /// Supplies the session store.
    #[must_use]
    pub fn session(mut self, session: impl SessionStore + 'static) -> Self {
        self.session = Some(Box::new(session));
        self
    }

    /// Supplies the event bus.
    #[must_use]
    pub fn events(mut self, events: impl EventBus + 'static) -> Self {
        self.events = Some(Box::new(events));
        self
    }

    /// Supplies the storage gateway.
    #[must_use]
    pub fn gateway(mut self, gateway: impl StorageGateway + 'static) -> Self {
        self.gateway = Some(Box::new(gateway));
        self
    }

    /// Supplies the catalog used for associations.
    #[must_use]
    pub fn catalog(mut self, catalog: impl Catalog + 'static) -> Self {
        self.catalog = Some(Box::new(catalog));
        self
    }

    /// Builds the cart, loading any existing content for its instance
    /// from the session.
    #[must_use]
    pub fn build(self) -> Cart {
        let session = self
            .session
            .unwrap_or_else(|| Box::new(MemorySessionStore::default()));

        let content = session
            .get(&self.instance)
            .map(CartSnapshot::into_items)
            .unwrap_or_default();

        Cart {
            instance: self.instance,
            content,
            tax_rate: self.config.default_tax_rate,
            discount_rate: self.config.default_discount_rate,
            created_at: None,
            updated_at: None,
            config: self.config,
            calculator: self
                .calculator
                .unwrap_or_else(|| Box::new(DefaultCalculator)),
            session,
            events: self.events.unwrap_or_else(|| Box::new(NoopEventBus)),
            gateway: self
                .gateway
                .unwrap_or_else(|| Box::new(MemoryStorageGateway::default())),
            catalog: self.catalog,
        }
    }
}

/// The cart aggregate for one `(session, instance)` pair.
#[derive(Debug)]
pub struct Cart {
    instance: Instance,
    content: Vec<CartItem>,
    tax_rate: Decimal,
    discount_rate: Decimal,
    created_at: Option<Timestamp>,
    updated_at: Option<Timestamp>,
    config: CartConfig,
    calculator: Box<dyn Calculator>,
    session: Box<dyn SessionStore>,
    events: Box<dyn EventBus>,
    gateway: Box<dyn StorageGateway>,
    catalog: Option<Box<dyn Catalog>>,
}

impl Default for Cart {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Cart {
    /// Starts a cart builder.
    #[must_use]
    pub fn builder() -> CartBuilder {
        CartBuilder::default()
    }

    /// The cart's instance name.
    #[must_use]
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// The cart configuration.
    #[must_use]
    pub fn config(&self) -> &CartConfig {
        &self.config
    }

    /// The lines in insertion order.
    #[must_use]
    pub fn content(&self) -> &[CartItem] {
        &self.content
    }

    /// When the restored record was created, if this cart was restored.
    #[must_use]
    pub fn created_at(&self) -> Option<Timestamp> {
        self.created_at
    }

    /// When the restored record was last written, if this cart was
    /// restored.
    #[must_use]
    pub fn updated_at(&self) -> Option<Timestamp> {
        self.updated_at
    }

    /// Whether the cart holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn count_items(&self) -> usize {
        self.content.len()
    }

    /// Total quantity across all lines.
    #[must_use]
    pub fn count(&self) -> Decimal {
        self.content.iter().map(CartItem::qty).sum()
    }

    fn position(&self, row_id: &RowId) -> Option<usize> {
        self.content.iter().position(|item| item.row_id() == row_id)
    }

    /// Returns the line under a row identity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidRowId`] when no such line exists.
    pub fn get(&self, row_id: &RowId) -> Result<&CartItem, CartError> {
        self.content
            .iter()
            .find(|item| item.row_id() == row_id)
            .ok_or_else(|| CartError::InvalidRowId(row_id.clone()))
    }

    /// Adds a line to the cart.
    ///
    /// An existing line with the same row identity accumulates the added
    /// quantity instead of duplicating; only the quantity merges, the
    /// original entry's price, name and options are retained.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] (wrapped) when the specification
    /// fails construction validation.
    pub fn add(&mut self, spec: ItemSpec<'_>) -> Result<CartItem, CartError> {
        let item = self.build_item(spec)?;

        Ok(self.add_cart_item(item, true))
    }

    /// Adds a batch of lines, returning the resulting lines in order.
    ///
    /// # Errors
    ///
    /// Returns the first specification's error; earlier additions stay
    /// applied.
    pub fn add_batch<'a>(
        &mut self,
        specs: impl IntoIterator<Item = ItemSpec<'a>>,
    ) -> Result<Vec<CartItem>, CartError> {
        specs.into_iter().map(|spec| self.add(spec)).collect()
    }

    fn build_item(&self, spec: ItemSpec<'_>) -> Result<CartItem, CartError> {
        let mut item = match spec {
            ItemSpec::Buyable {
                buyable,
                qty,
                options,
            } => {
                let mut item = CartItem::from_buyable(buyable, options)?;
                item.set_quantity(qty)?;
                item.set_tax_rate(self.tax_rate);
                item.set_discount_rate(self.discount_rate);
                item
            }
            ItemSpec::Attributes(attrs) => {
                let mut item = CartItem::from_attributes(&attrs)?;

                // An explicitly supplied rate survives the global default.
                if attrs.tax_rate.is_none() {
                    item.set_tax_rate(self.tax_rate);
                }

                if attrs.discount_rate.is_none() {
                    item.set_discount_rate(self.discount_rate);
                }

                item
            }
            ItemSpec::Explicit {
                id,
                name,
                qty,
                price,
                weight,
                options,
            } => {
                let mut item = CartItem::new(id, name, price, weight, options)?;
                item.set_quantity(qty)?;
                item.set_tax_rate(self.tax_rate);
                item.set_discount_rate(self.discount_rate);
                item
            }
        };

        item.set_instance(self.instance.clone());

        Ok(item)
    }

    fn add_cart_item(&mut self, item: CartItem, dispatch: bool) -> CartItem {
        let resulting = match self.position(item.row_id()) {
            Some(index) => match self.content.get_mut(index) {
                Some(existing) => {
                    existing.set_qty_raw(existing.qty() + item.qty());
                    existing.clone()
                }
                None => item,
            },
            None => {
                self.content.push(item.clone());
                item
            }
        };

        if dispatch {
            self.events.publish(CartEvent::Adding(resulting.clone()));
        }

        self.persist();

        if dispatch {
            self.events.publish(CartEvent::Added(resulting.clone()));
        }

        debug!(instance = %self.instance, row_id = %resulting.row_id(), "cart line added");

        resulting
    }

    /// Applies a change to the line under a row identity.
    ///
    /// A re-keying change colliding with an existing row sums quantities
    /// into that row and keeps the updated slot's ordinal position. A
    /// resulting quantity of zero or below removes the line (with the
    /// removal notifications) and returns `None`.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidRowId`] when no such line exists, or a
    /// wrapped [`ValidationError`] when a supplied field is invalid.
    pub fn update(
        &mut self,
        row_id: &RowId,
        change: UpdateSpec<'_>,
    ) -> Result<Option<CartItem>, CartError> {
        let index = self
            .position(row_id)
            .ok_or_else(|| CartError::InvalidRowId(row_id.clone()))?;

        let mut item = match self.content.get(index) {
            Some(item) => item.clone(),
            None => return Err(CartError::InvalidRowId(row_id.clone())),
        };

        match change {
            UpdateSpec::Buyable(buyable) => item.update_from_buyable(buyable),
            UpdateSpec::Attributes(attrs) => item.apply(&attrs)?,
            UpdateSpec::Qty(qty) => item.set_qty_raw(qty),
        }

        if item.qty() <= Decimal::ZERO {
            self.remove(row_id)?;

            return Ok(None);
        }

        let new_row_id = item.row_id().clone();
        let mut slot_index = index;

        if new_row_id != *row_id {
            if let Some(existing_index) = self.position(&new_row_id) {
                // The re-keyed line collides with an existing row: the
                // colliding entry absorbs the quantity and takes over the
                // updated slot's ordinal position.
                let mut merged = self.content.remove(existing_index);

                if existing_index < index {
                    slot_index = index - 1;
                }

                merged.set_qty_raw(merged.qty() + item.qty());
                item = merged;
            }
        }

        if let Some(slot) = self.content.get_mut(slot_index) {
            *slot = item.clone();
        }

        self.events.publish(CartEvent::Updating(item.clone()));
        self.persist();
        self.events.publish(CartEvent::Updated(item.clone()));

        debug!(instance = %self.instance, row_id = %item.row_id(), "cart line updated");

        Ok(Some(item))
    }

    /// Removes the line under a row identity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidRowId`] when no such line exists.
    pub fn remove(&mut self, row_id: &RowId) -> Result<(), CartError> {
        let index = self
            .position(row_id)
            .ok_or_else(|| CartError::InvalidRowId(row_id.clone()))?;

        let item = self.content.remove(index);

        self.events.publish(CartEvent::Removing(item.clone()));
        self.persist();
        self.events.publish(CartEvent::Removed(item));

        debug!(instance = %self.instance, row_id = %row_id, "cart line removed");

        Ok(())
    }

    /// Empties the cart and its session slot.
    pub fn clear(&mut self) {
        self.content.clear();
        self.session.remove(&self.instance);
    }

    /// Sets the tax rate of one line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidRowId`] when no such line exists.
    pub fn set_tax(&mut self, row_id: &RowId, rate: Decimal) -> Result<(), CartError> {
        let index = self
            .position(row_id)
            .ok_or_else(|| CartError::InvalidRowId(row_id.clone()))?;

        if let Some(item) = self.content.get_mut(index) {
            item.set_tax_rate(rate);
        }

        self.persist();

        Ok(())
    }

    /// Sets the discount rate of one line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidRowId`] when no such line exists.
    pub fn set_discount(&mut self, row_id: &RowId, rate: Decimal) -> Result<(), CartError> {
        let index = self
            .position(row_id)
            .ok_or_else(|| CartError::InvalidRowId(row_id.clone()))?;

        if let Some(item) = self.content.get_mut(index) {
            item.set_discount_rate(rate);
        }

        self.persist();

        Ok(())
    }

    /// Sets the cart-level tax rate and applies it to every existing
    /// line.
    pub fn set_global_tax(&mut self, rate: Decimal) {
        self.tax_rate = rate;

        for item in &mut self.content {
            item.set_tax_rate(rate);
        }

        self.persist();
    }

    /// Sets the cart-level discount rate and applies it to every existing
    /// line.
    pub fn set_global_discount(&mut self, rate: Decimal) {
        self.discount_rate = rate;

        for item in &mut self.content {
            item.set_discount_rate(rate);
        }

        self.persist();
    }

    /// Associates a line with a catalog model.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidRowId`] when no such line exists, or a
    /// wrapped [`UnknownModelError`] when no catalog is configured or the
    /// model type is unknown to it.
    pub fn associate(&mut self, row_id: &RowId, model: &str) -> Result<(), CartError> {
        let index = self
            .position(row_id)
            .ok_or_else(|| CartError::InvalidRowId(row_id.clone()))?;

        let catalog = self
            .catalog
            .as_deref()
            .ok_or_else(|| UnknownModelError(model.to_string()))?;

        if let Some(item) = self.content.get_mut(index) {
            item.associate(model, catalog)?;
        }

        self.persist();

        Ok(())
    }

    /// Resolves a derived attribute of a line by name.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidRowId`] when no such line exists, or a
    /// wrapped [`UnknownAttributeError`] when resolution exhausts the
    /// calculator and any associated catalog record.
    pub fn item_attribute(&self, row_id: &RowId, name: &str) -> Result<Decimal, CartError> {
        let item = self.get(row_id)?;

        Ok(item.attribute(name, self.calculator.as_ref(), self.catalog.as_deref())?)
    }

    /// Pre-discount subtotal, Σ `price × qty`.
    #[must_use]
    pub fn initial(&self) -> Decimal {
        self.content
            .iter()
            .map(|item| item.price() * item.qty())
            .sum()
    }

    /// Discounted subtotal excluding tax.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.fold(|item| item.subtotal(self.calculator.as_ref()))
    }

    /// Total tax amount.
    #[must_use]
    pub fn tax(&self) -> Decimal {
        self.fold(|item| item.tax_total(self.calculator.as_ref()))
    }

    /// Total per-line discount amount.
    #[must_use]
    pub fn discount(&self) -> Decimal {
        self.fold(|item| item.discount_total(self.calculator.as_ref()))
    }

    /// Grand total including discount and tax.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.fold(|item| item.total(self.calculator.as_ref()))
    }

    /// Grand total including discount and tax.
    ///
    /// Alias of [`total`](Self::total).
    #[must_use]
    pub fn price_total(&self) -> Decimal {
        self.total()
    }

    /// Total weight, Σ `weight × qty`.
    #[must_use]
    pub fn weight(&self) -> Decimal {
        self.content.iter().map(CartItem::weight_total).sum()
    }

    fn fold(&self, f: impl Fn(&CartItem) -> Decimal) -> Decimal {
        self.content.iter().map(f).sum()
    }

    /// Cart-level coupon discount against the subtotal.
    #[must_use]
    pub fn coupon_discount(&self, coupons: &[Coupon]) -> Decimal {
        coupon_total(coupons, self.subtotal())
    }

    /// Shipping total for the supplied context.
    #[must_use]
    pub fn shipping(&self, context: &ShippingContext) -> Decimal {
        shipping_total(
            &self.content,
            &self.config.shipping,
            context,
            self.catalog.as_deref(),
        )
    }

    /// Renders an amount with the configured format.
    #[must_use]
    pub fn formatted(&self, amount: Decimal) -> String {
        self.config.format.render(amount)
    }

    /// Renders an amount with a per-call format override.
    #[must_use]
    pub fn formatted_with(&self, amount: Decimal, format: &Format) -> String {
        format.render(amount)
    }

    /// The subtotal rendered with the configured format.
    #[must_use]
    pub fn subtotal_formatted(&self) -> String {
        self.formatted(self.subtotal())
    }

    /// The tax total rendered with the configured format.
    #[must_use]
    pub fn tax_formatted(&self) -> String {
        self.formatted(self.tax())
    }

    /// The grand total rendered with the configured format.
    #[must_use]
    pub fn total_formatted(&self) -> String {
        self.formatted(self.total())
    }

    /// Switches to another instance, persisting the current slot and
    /// loading the target slot's content from the session.
    pub fn switch_instance(&mut self, instance: impl Into<Instance>) {
        let instance = instance.into();

        if instance == self.instance {
            return;
        }

        self.persist();
        self.instance = instance;
        self.content = self
            .session
            .get(&self.instance)
            .map(CartSnapshot::into_items)
            .unwrap_or_default();

        debug!(instance = %self.instance, "cart instance switched");
    }

    /// Switches to the instance named by an owner and applies its global
    /// discount.
    pub fn switch_instance_for(&mut self, owner: &dyn InstanceIdentifier) {
        self.switch_instance(owner.instance_identifier());
        self.set_global_discount(owner.instance_global_discount());
    }

    fn snapshot(&self) -> CartSnapshot {
        CartSnapshot::new(self.content.clone())
    }

    fn persist(&mut self) {
        let snapshot = self.snapshot();
        self.session.put(&self.instance, snapshot);
    }

    /// Stores the current content durably under an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::AlreadyStored`] when a record already exists
    /// for the identifier and the current instance.
    pub fn store(&mut self, identifier: &str) -> Result<(), CartError> {
        if self.gateway.exists(identifier, &self.instance) {
            return Err(CartError::AlreadyStored {
                identifier: identifier.to_string(),
                instance: self.instance.clone(),
            });
        }

        let now = Timestamp::now();

        self.gateway.insert(StoredCart {
            identifier: identifier.to_string(),
            instance: self.instance.clone(),
            content: self.snapshot(),
            created_at: now,
            updated_at: now,
        });

        self.events.publish(CartEvent::Stored);

        debug!(identifier, instance = %self.instance, "cart stored");

        Ok(())
    }

    /// Restores a stored cart into the session, consuming the record.
    ///
    /// Stored lines replace same-row lines in the record's instance slot
    /// (no quantity summing — use [`merge`](Self::merge) for that). The
    /// record's timestamps are captured onto the cart and the record is
    /// deleted; a second restore with the same identifier is a no-op.
    ///
    /// Returns `false` when no record exists for the identifier and the
    /// current instance.
    pub fn restore(&mut self, identifier: &str) -> bool {
        let Some(record) = self.gateway.first(identifier, &self.instance) else {
            return false;
        };

        let original = self.instance.clone();

        self.switch_instance(record.instance.clone());

        for stored in record.content.items() {
            let mut item = stored.clone();
            item.set_instance(self.instance.clone());

            match self.position(item.row_id()) {
                Some(index) => {
                    if let Some(slot) = self.content.get_mut(index) {
                        *slot = item;
                    }
                }
                None => self.content.push(item),
            }
        }

        self.events.publish(CartEvent::Restored);
        self.persist();
        self.switch_instance(original);

        self.created_at = Some(record.created_at);
        self.updated_at = Some(record.updated_at);

        self.gateway.delete(identifier, &record.instance);

        debug!(identifier, "cart restored");

        true
    }

    /// Deletes a stored cart without touching live content.
    ///
    /// Returns `false` when no record exists for the identifier and the
    /// current instance.
    pub fn erase(&mut self, identifier: &str) -> bool {
        if !self.gateway.exists(identifier, &self.instance) {
            return false;
        }

        self.gateway.delete(identifier, &self.instance);
        self.events.publish(CartEvent::Erased);

        debug!(identifier, instance = %self.instance, "stored cart erased");

        true
    }

    /// Replays a stored cart through the add path against the live cart,
    /// summing quantities for shared rows. The record is retained.
    ///
    /// Stored per-line rates are overwritten by the live cart's global
    /// rates unless `keep_discount`/`keep_tax` is set; per-line add
    /// notifications fire only when `dispatch_add`. One `Merged` event
    /// fires at the end.
    ///
    /// Returns `false` when no record exists for the identifier and the
    /// given instance.
    pub fn merge(
        &mut self,
        identifier: &str,
        keep_discount: bool,
        keep_tax: bool,
        dispatch_add: bool,
        instance: &Instance,
    ) -> bool {
        let Some(record) = self.gateway.first(identifier, instance) else {
            return false;
        };

        for stored in record.content.items() {
            let mut item = stored.clone();

            if !keep_discount {
                item.set_discount_rate(self.discount_rate);
            }

            if !keep_tax {
                item.set_tax_rate(self.tax_rate);
            }

            item.set_instance(self.instance.clone());
            self.add_cart_item(item, dispatch_add);
        }

        self.events.publish(CartEvent::Merged);

        debug!(identifier, instance = %instance, "stored cart merged");

        true
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{
        calculator::Figures,
        catalog::CatalogRecord,
        memory::{RecordingEventBus, StaticCatalog},
    };

    use super::*;

    fn widget_spec(qty: i64) -> ItemSpec<'static> {
        ItemSpec::explicit(1, "Widget", Decimal::from(qty), Decimal::from(10), Decimal::from(2))
    }

    fn test_cart() -> (Cart, MemorySessionStore, RecordingEventBus) {
        let session = MemorySessionStore::default();
        let events = RecordingEventBus::default();

        let cart = Cart::builder()
            .session(session.clone())
            .events(events.clone())
            .build();

        (cart, session, events)
    }

    #[test]
    fn add_applies_global_rates_and_returns_the_line() -> TestResult {
        let (mut cart, _, _) = test_cart();
        cart.set_global_tax(Decimal::from(21));

        let item = cart.add(widget_spec(2))?;

        assert_eq!(item.qty(), Decimal::from(2));
        assert_eq!(item.tax_rate(), Decimal::from(21));
        assert_eq!(cart.count_items(), 1);

        Ok(())
    }

    #[test]
    fn adding_the_same_row_twice_sums_quantities() -> TestResult {
        let (mut cart, _, _) = test_cart();

        cart.add(widget_spec(2))?;
        let merged = cart.add(widget_spec(3))?;

        assert_eq!(cart.count_items(), 1);
        assert_eq!(merged.qty(), Decimal::from(5));
        assert_eq!(cart.count(), Decimal::from(5));

        Ok(())
    }

    #[test]
    fn merge_on_add_keeps_the_original_entry_fields() -> TestResult {
        let (mut cart, _, _) = test_cart();

        cart.add(widget_spec(1))?;

        // Same row identity, different display name and price: only the
        // quantity accumulates.
        let merged = cart.add(ItemSpec::explicit(
            1,
            "Widget v2",
            Decimal::ONE,
            Decimal::from(12),
            Decimal::from(2),
        ))?;

        assert_eq!(merged.name(), "Widget");
        assert_eq!(merged.price(), Decimal::from(10));
        assert_eq!(merged.qty(), Decimal::from(2));

        Ok(())
    }

    #[test]
    fn distinct_option_sets_occupy_distinct_rows() -> TestResult {
        let (mut cart, _, _) = test_cart();

        let red = cart.add(ItemSpec::explicit_with_options(
            1,
            "Widget",
            Decimal::ONE,
            Decimal::from(10),
            Decimal::ZERO,
            ItemOptions::from_pairs([("color", "red")]),
        ))?;

        let blue = cart.add(ItemSpec::explicit_with_options(
            1,
            "Widget",
            Decimal::ONE,
            Decimal::from(10),
            Decimal::ZERO,
            ItemOptions::from_pairs([("color", "blue")]),
        ))?;

        assert_ne!(red.row_id(), blue.row_id());
        assert_eq!(cart.count_items(), 2);

        Ok(())
    }

    #[test]
    fn attribute_path_keeps_supplied_rates() -> TestResult {
        let (mut cart, _, _) = test_cart();
        cart.set_global_tax(Decimal::from(21));

        let item = cart.add(ItemSpec::Attributes(ItemAttributes {
            id: Some(ItemId::from(1)),
            name: Some("Widget".to_string()),
            price: Some(Decimal::from(10)),
            tax_rate: Some(Decimal::from(9)),
            ..ItemAttributes::default()
        }))?;

        assert_eq!(item.tax_rate(), Decimal::from(9));
        assert_eq!(item.discount_rate(), Decimal::ZERO);

        Ok(())
    }

    #[test]
    fn add_batch_returns_results_in_order() -> TestResult {
        let (mut cart, _, _) = test_cart();

        let results = cart.add_batch([
            ItemSpec::explicit(1, "Widget", Decimal::ONE, Decimal::from(10), Decimal::ZERO),
            ItemSpec::explicit(2, "Gadget", Decimal::ONE, Decimal::from(20), Decimal::ZERO),
        ])?;

        assert_eq!(results.len(), 2);
        assert_eq!(results.first().map(CartItem::name), Some("Widget"));
        assert_eq!(results.get(1).map(CartItem::name), Some("Gadget"));

        Ok(())
    }

    #[test]
    fn update_with_a_bare_quantity_replaces_it() -> TestResult {
        let (mut cart, _, _) = test_cart();

        let row_id = cart.add(widget_spec(2))?.row_id().clone();
        let updated = cart.update(&row_id, UpdateSpec::Qty(Decimal::from(7)))?;

        assert_eq!(updated.map(|item| item.qty()), Some(Decimal::from(7)));

        Ok(())
    }

    #[test]
    fn update_to_zero_quantity_removes_the_line() -> TestResult {
        let (mut cart, _, events) = test_cart();

        let row_id = cart.add(widget_spec(2))?.row_id().clone();
        events.clear();

        let updated = cart.update(&row_id, UpdateSpec::Qty(Decimal::ZERO))?;

        assert!(updated.is_none());
        assert!(cart.is_empty());
        assert!(matches!(cart.get(&row_id), Err(CartError::InvalidRowId(_))));
        assert_eq!(events.names(), vec!["removing", "removed"]);

        Ok(())
    }

    #[test]
    fn update_rekey_collision_merges_at_the_updated_slot() -> TestResult {
        let (mut cart, _, _) = test_cart();

        let plain = cart.add(widget_spec(2))?;
        let red = cart.add(ItemSpec::explicit_with_options(
            1,
            "Widget",
            Decimal::from(3),
            Decimal::from(10),
            Decimal::from(2),
            ItemOptions::from_pairs([("color", "red")]),
        ))?;
        cart.add(ItemSpec::explicit(2, "Gadget", Decimal::ONE, Decimal::from(20), Decimal::ZERO))?;

        // Give the plain line the red option set: its row identity becomes
        // the red line's, quantities sum, and the merged entry keeps the
        // plain line's ordinal position (index 0).
        let merged = cart
            .update(
                plain.row_id(),
                UpdateSpec::Attributes(ItemAttributes {
                    options: Some(ItemOptions::from_pairs([("color", "red")])),
                    ..ItemAttributes::default()
                }),
            )?
            .expect("expected merged line");

        assert_eq!(merged.row_id(), red.row_id());
        assert_eq!(merged.qty(), Decimal::from(5));
        assert_eq!(cart.count_items(), 2);

        // The merged entry keeps the updated slot's ordinal position.
        assert_eq!(
            cart.content().first().map(|item| item.row_id().clone()),
            Some(red.row_id().clone())
        );
        assert_eq!(cart.content().get(1).map(CartItem::name), Some("Gadget"));

        Ok(())
    }

    #[test]
    fn update_unknown_row_fails() {
        let (mut cart, _, _) = test_cart();
        let bogus = RowId::compute(&ItemId::from(99), &ItemOptions::new());

        let result = cart.update(&bogus, UpdateSpec::Qty(Decimal::ONE));

        assert!(matches!(result, Err(CartError::InvalidRowId(_))));
    }

    #[test]
    fn remove_unknown_row_fails() {
        let (mut cart, _, _) = test_cart();
        let bogus = RowId::compute(&ItemId::from(99), &ItemOptions::new());

        assert!(matches!(
            cart.remove(&bogus),
            Err(CartError::InvalidRowId(_))
        ));
    }

    #[test]
    fn totals_follow_the_documented_scenario() -> TestResult {
        let (mut cart, _, _) = test_cart();

        cart.add(widget_spec(3))?;

        assert_eq!(cart.count(), Decimal::from(3));
        assert_eq!(cart.count_items(), 1);
        assert_eq!(cart.subtotal(), Decimal::from(30));
        assert_eq!(cart.weight(), Decimal::from(6));

        cart.set_global_tax(Decimal::from(10));

        assert_eq!(cart.tax(), Decimal::from(3));
        assert_eq!(cart.total(), Decimal::from(33));
        assert_eq!(cart.price_total(), cart.total());
        assert_eq!(cart.subtotal_formatted(), "30.00");
        assert_eq!(cart.total_formatted(), "33.00");

        Ok(())
    }

    #[test]
    fn global_discount_applies_retroactively() -> TestResult {
        let (mut cart, _, _) = test_cart();

        cart.add(widget_spec(2))?;
        cart.set_global_discount(Decimal::from(50));

        assert_eq!(cart.discount(), Decimal::from(10));
        assert_eq!(cart.subtotal(), Decimal::from(10));
        assert_eq!(cart.initial(), Decimal::from(20));

        Ok(())
    }

    #[test]
    fn per_line_rates_override_without_notifications() -> TestResult {
        let (mut cart, _, events) = test_cart();

        let row_id = cart.add(widget_spec(1))?.row_id().clone();
        events.clear();

        cart.set_tax(&row_id, Decimal::from(9))?;
        cart.set_discount(&row_id, Decimal::from(5))?;

        assert!(events.events().is_empty());
        assert_eq!(cart.get(&row_id)?.tax_rate(), Decimal::from(9));
        assert_eq!(cart.get(&row_id)?.discount_rate(), Decimal::from(5));

        Ok(())
    }

    #[test]
    fn add_and_remove_bracket_the_write_back_with_events() -> TestResult {
        let (mut cart, _, events) = test_cart();

        let row_id = cart.add(widget_spec(1))?.row_id().clone();
        cart.remove(&row_id)?;

        assert_eq!(
            events.names(),
            vec!["adding", "added", "removing", "removed"]
        );

        Ok(())
    }

    #[test]
    fn content_is_written_back_to_the_session() -> TestResult {
        let (mut cart, session, _) = test_cart();

        cart.add(widget_spec(2))?;

        let snapshot = session.get(&Instance::default()).expect("missing slot");
        assert_eq!(snapshot.items().len(), 1);

        // A second cart over the same session picks the content up.
        let other = Cart::builder().session(session.clone()).build();
        assert_eq!(other.count(), Decimal::from(2));

        Ok(())
    }

    #[test]
    fn switching_instances_isolates_content() -> TestResult {
        let (mut cart, _, _) = test_cart();

        cart.add(widget_spec(2))?;
        cart.switch_instance("wishlist");

        assert!(cart.is_empty());
        assert_eq!(cart.instance(), &Instance::from("wishlist"));

        cart.add(ItemSpec::explicit(9, "Dream", Decimal::ONE, Decimal::from(99), Decimal::ZERO))?;
        cart.switch_instance("default");

        assert_eq!(cart.count(), Decimal::from(2));

        Ok(())
    }

    #[test]
    fn item_attribute_resolves_calculator_and_catalog_names() -> TestResult {
        let catalog = StaticCatalog::default();
        let mut record = CatalogRecord::titled("Widget Deluxe");
        record
            .attributes
            .insert("reorder_level".to_string(), Decimal::from(25));
        catalog.insert("Product", 1, record);

        let mut cart = Cart::builder().catalog(catalog).build();
        let row_id = cart.add(widget_spec(2))?.row_id().clone();
        cart.associate(&row_id, "Product")?;

        assert_eq!(
            cart.item_attribute(&row_id, "subtotal")?,
            Decimal::from(20)
        );
        assert_eq!(
            cart.item_attribute(&row_id, "reorder_level")?,
            Decimal::from(25)
        );
        assert!(matches!(
            cart.item_attribute(&row_id, "lead_time"),
            Err(CartError::UnknownAttribute(_))
        ));

        Ok(())
    }

    #[test]
    fn associate_without_a_catalog_is_an_unknown_model() -> TestResult {
        let (mut cart, _, _) = test_cart();
        let row_id = cart.add(widget_spec(1))?.row_id().clone();

        assert!(matches!(
            cart.associate(&row_id, "Product"),
            Err(CartError::UnknownModel(_))
        ));

        Ok(())
    }

    #[test]
    fn a_custom_calculator_drives_every_total() -> TestResult {
        /// Charges a flat unit tax regardless of rate.
        #[derive(Debug)]
        struct FlatTax;

        impl Calculator for FlatTax {
            fn discount(&self, _figures: &Figures) -> Decimal {
                Decimal::ZERO
            }

            fn tax(&self, _figures: &Figures) -> Decimal {
                Decimal::ONE
            }
        }

        let mut cart = Cart::builder().calculator(FlatTax).build();
        cart.add(widget_spec(3))?;

        assert_eq!(cart.tax(), Decimal::from(3));
        assert_eq!(cart.total(), Decimal::from(33));

        Ok(())
    }
}
