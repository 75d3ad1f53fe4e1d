//! Item Options
//!
//! Auxiliary attributes (size, colour, …) attached to a cart line to
//! distinguish otherwise-identical products. Entries are kept sorted by key
//! so two option sets with the same pairs canonicalize identically
//! regardless of insertion order.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A scalar option value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// Boolean flag, e.g. `gift_wrapped`.
    Bool(bool),

    /// Integral value, e.g. a size index.
    Int(i64),

    /// Free-form text, e.g. a colour name.
    Text(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(value) => write!(f, "{value}"),
            OptionValue::Int(value) => write!(f, "{value}"),
            OptionValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

/// An order-insensitive key/value option map, sorted by key.
///
/// Inserting an existing key replaces its value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(
    from = "Vec<(String, OptionValue)>",
    into = "Vec<(String, OptionValue)>"
)]
pub struct ItemOptions {
    entries: SmallVec<[(String, OptionValue); 4]>,
}

impl ItemOptions {
    /// Creates an empty option map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an option map from key/value pairs.
    ///
    /// Pairs are sorted by key; a repeated key keeps the last value.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<OptionValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut options = Self::new();

        for (key, value) in pairs {
            options.set(key, value);
        }

        options
    }

    /// Sets an option, keeping entries sorted by key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        let key = key.into();
        let value = value.into();

        match self.entries.binary_search_by(|(k, _)| k.cmp(&key)) {
            Ok(index) => {
                if let Some(entry) = self.entries.get_mut(index) {
                    entry.1 = value;
                }
            }
            Err(index) => self.entries.insert(index, (key, value)),
        }
    }

    /// Returns the value for a key, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
            .ok()
            .and_then(|index| self.entries.get(index))
            .map(|(_, value)| value)
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks whether the option map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The canonical serialization of the option map.
    ///
    /// Entries render as `key=value;` in key order, so equal option sets
    /// produce equal canonical strings independent of insertion order. Row
    /// identity hashing relies on this form being deterministic.
    #[must_use]
    pub fn canonical(&self) -> String {
        let mut out = String::new();

        for (key, value) in self.iter() {
            out.push_str(key);
            out.push('=');
            out.push_str(&value.to_string());
            out.push(';');
        }

        out
    }
}

impl From<Vec<(String, OptionValue)>> for ItemOptions {
    fn from(pairs: Vec<(String, OptionValue)>) -> Self {
        Self::from_pairs(pairs)
    }
}

impl From<ItemOptions> for Vec<(String, OptionValue)> {
    fn from(options: ItemOptions) -> Self {
        options.entries.into_vec()
    }
}
