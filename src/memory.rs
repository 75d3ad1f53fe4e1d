//! In-Memory Collaborators
//!
//! Single-process implementations of the injected capabilities, used by
//! the test suites and by consumers that do not bring their own backends.
//! Handles are cheap clones sharing state through `Rc<RefCell<_>>`; they
//! are deliberately not `Send`, matching the single-writer-per-session
//! model.

use std::{cell::RefCell, rc::Rc};

use rustc_hash::FxHashMap;

use crate::{
    catalog::{Catalog, CatalogRecord},
    events::{CartEvent, EventBus},
    item::ItemId,
    session::{Instance, SessionStore},
    storage::{CartSnapshot, StorageGateway, StoredCart},
};

/// Session storage backed by a shared hash map.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    slots: Rc<RefCell<FxHashMap<Instance, CartSnapshot>>>,
}

impl SessionStore for MemorySessionStore {
    fn has(&self, instance: &Instance) -> bool {
        self.slots.borrow().contains_key(instance)
    }

    fn get(&self, instance: &Instance) -> Option<CartSnapshot> {
        self.slots.borrow().get(instance).cloned()
    }

    fn put(&mut self, instance: &Instance, snapshot: CartSnapshot) {
        self.slots.borrow_mut().insert(instance.clone(), snapshot);
    }

    fn remove(&mut self, instance: &Instance) {
        self.slots.borrow_mut().remove(instance);
    }
}

/// An event bus that records every published event.
#[derive(Debug, Clone, Default)]
pub struct RecordingEventBus {
    events: Rc<RefCell<Vec<CartEvent>>>,
}

impl RecordingEventBus {
    /// The recorded events, in publication order.
    #[must_use]
    pub fn events(&self) -> Vec<CartEvent> {
        self.events.borrow().clone()
    }

    /// The recorded event names, in publication order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.events.borrow().iter().map(CartEvent::name).collect()
    }

    /// Drops all recorded events.
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl EventBus for RecordingEventBus {
    fn publish(&self, event: CartEvent) {
        self.events.borrow_mut().push(event);
    }
}

/// Record storage backed by a shared vector.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorageGateway {
    records: Rc<RefCell<Vec<StoredCart>>>,
}

impl MemoryStorageGateway {
    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    /// Whether no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}

impl StorageGateway for MemoryStorageGateway {
    fn exists(&self, identifier: &str, instance: &Instance) -> bool {
        self.records
            .borrow()
            .iter()
            .any(|record| record.identifier == identifier && &record.instance == instance)
    }

    fn insert(&mut self, record: StoredCart) {
        self.records.borrow_mut().push(record);
    }

    fn first(&self, identifier: &str, instance: &Instance) -> Option<StoredCart> {
        self.records
            .borrow()
            .iter()
            .find(|record| record.identifier == identifier && &record.instance == instance)
            .cloned()
    }

    fn delete(&mut self, identifier: &str, instance: &Instance) {
        self.records
            .borrow_mut()
            .retain(|record| !(record.identifier == identifier && &record.instance == instance));
    }
}

/// A catalog backed by nested hash maps, for tests and demos.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    models: Rc<RefCell<FxHashMap<String, FxHashMap<String, CatalogRecord>>>>,
}

impl StaticCatalog {
    /// Registers a model type with no records yet.
    pub fn register_model(&self, model: &str) {
        self.models
            .borrow_mut()
            .entry(model.to_string())
            .or_default();
    }

    /// Inserts a record under a model type, registering the model.
    pub fn insert(&self, model: &str, id: impl Into<ItemId>, record: CatalogRecord) {
        self.models
            .borrow_mut()
            .entry(model.to_string())
            .or_default()
            .insert(id.into().to_string(), record);
    }
}

impl Catalog for StaticCatalog {
    fn contains_model(&self, model: &str) -> bool {
        self.models.borrow().contains_key(model)
    }

    fn find(&self, model: &str, id: &ItemId) -> Option<CatalogRecord> {
        self.models
            .borrow()
            .get(model)
            .and_then(|records| records.get(&id.to_string()))
            .cloned()
    }
}
