//! Durable Storage
//!
//! The versioned snapshot format cart content is serialized into, the
//! stored-record shape, and the injected gateway capability behind
//! store/restore/merge/erase. At most one record exists per
//! `(identifier, instance)` pair; the cart enforces this with an
//! existence check before insert.

use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{item::CartItem, session::Instance};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Errors reading or writing serialized snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot was written by an unknown format version.
    #[error("unsupported cart snapshot version {0}")]
    UnsupportedVersion(u32),

    /// Wrapped serialization error.
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// A versioned, serializable snapshot of cart content.
///
/// The explicit version field keeps stored snapshots readable across
/// format changes; readers reject versions they do not understand instead
/// of misinterpreting them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    version: u32,
    items: Vec<CartItem>,
}

impl CartSnapshot {
    /// Wraps cart lines in a snapshot at the current version.
    #[must_use]
    pub fn new(items: Vec<CartItem>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            items,
        }
    }

    /// Snapshot format version.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The snapshotted lines.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Consumes the snapshot, returning its lines.
    #[must_use]
    pub fn into_items(self) -> Vec<CartItem> {
        self.items
    }

    /// Serializes the snapshot to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Serde`] if serialization fails.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Reads a snapshot from JSON, rejecting unknown versions.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::UnsupportedVersion`] for a version other
    /// than [`SNAPSHOT_VERSION`], or [`SnapshotError::Serde`] for malformed
    /// input.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }

        Ok(snapshot)
    }
}

/// A durably stored cart record.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCart {
    /// Caller-chosen identifier, e.g. a user id.
    pub identifier: String,

    /// The instance the cart was stored from.
    pub instance: Instance,

    /// Snapshot of the cart content at store time.
    pub content: CartSnapshot,

    /// When the record was created.
    pub created_at: Timestamp,

    /// When the record was last written.
    pub updated_at: Timestamp,
}

/// Record storage keyed by `(identifier, instance)`.
///
/// The existence check and a subsequent read or delete are separate round
/// trips; exactly-once store semantics against concurrent writers need a
/// uniqueness constraint in the backing store.
pub trait StorageGateway: fmt::Debug {
    /// Checks whether a record exists for the pair.
    fn exists(&self, identifier: &str, instance: &Instance) -> bool;

    /// Inserts a record.
    fn insert(&mut self, record: StoredCart);

    /// Reads the record for the pair, if any.
    fn first(&self, identifier: &str, instance: &Instance) -> Option<StoredCart>;

    /// Deletes the record for the pair, if any.
    fn delete(&mut self, identifier: &str, instance: &Instance);
}
