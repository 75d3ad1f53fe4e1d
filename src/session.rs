//! Session Store
//!
//! The injected key-value capability a cart persists its live content
//! into. Keys are typed [`Instance`] names rather than concatenated
//! strings, so one session can hold several independent carts
//! ("default", "wishlist", …).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::storage::CartSnapshot;

/// A named partition of cart state within one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instance(String);

impl Instance {
    /// Creates an instance name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The instance name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self("default".to_string())
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Instance {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Instance {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Keyed storage for live cart content, one snapshot per instance.
///
/// The surrounding session mechanism is assumed to serialize access per
/// user, so implementations need no internal locking.
pub trait SessionStore: fmt::Debug {
    /// Checks whether a snapshot exists for the instance.
    fn has(&self, instance: &Instance) -> bool;

    /// Reads the snapshot for the instance, if any.
    fn get(&self, instance: &Instance) -> Option<CartSnapshot>;

    /// Writes the snapshot for the instance, replacing any previous one.
    fn put(&mut self, instance: &Instance, snapshot: CartSnapshot);

    /// Drops the snapshot for the instance.
    fn remove(&mut self, instance: &Instance);
}
