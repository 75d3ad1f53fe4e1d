//! Buyable
//!
//! Capabilities catalog entities implement to interact with a cart. A
//! [`Buyable`] is snapshotted into a cart line at add time; an
//! [`InstanceIdentifier`] names the cart instance a multi-tenant owner
//! keeps its lines in.

use rust_decimal::Decimal;

use crate::{item::ItemId, options::ItemOptions, session::Instance};

/// An entity that can be added to a cart.
///
/// All accessors receive the chosen options, so variant selection (size,
/// colour) can influence identity, description and price.
pub trait Buyable {
    /// Identifier of the entity for the given options.
    fn identifier(&self, options: &ItemOptions) -> ItemId;

    /// Display description for the given options.
    fn description(&self, options: &ItemOptions) -> String;

    /// Unit price for the given options.
    fn price(&self, options: &ItemOptions) -> Decimal;

    /// Unit weight for the given options.
    fn weight(&self, options: &ItemOptions) -> Decimal {
        Decimal::ZERO
    }
}

/// An owner that names its own cart instance.
pub trait InstanceIdentifier {
    /// The instance the owner's cart lives under.
    fn instance_identifier(&self) -> Instance;

    /// The global discount rate applied to the owner's cart.
    fn instance_global_discount(&self) -> Decimal {
        Decimal::ZERO
    }
}
