//! Catalog
//!
//! The injected lookup capability behind item associations. A cart line
//! stores only the catalog model's type name; resolution happens lazily
//! when shipping exclusions or attribute fallback need the record.

use std::fmt;

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::item::ItemId;

/// The association target type does not exist in the catalog.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown catalog model `{0}`")]
pub struct UnknownModelError(pub String);

/// A resolved catalog record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogRecord {
    /// Display title of the catalog entity.
    pub title: String,

    /// Named numeric fields exposed for attribute fallback.
    pub attributes: FxHashMap<String, Decimal>,
}

impl CatalogRecord {
    /// Creates a record with a title and no extra attributes.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            attributes: FxHashMap::default(),
        }
    }
}

/// Catalog lookup by model type name and item identifier.
pub trait Catalog: fmt::Debug {
    /// Checks whether the model type name is known.
    fn contains_model(&self, model: &str) -> bool;

    /// Finds the record for an item under a model, if any.
    fn find(&self, model: &str, id: &ItemId) -> Option<CatalogRecord>;
}
