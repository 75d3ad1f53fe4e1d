//! Trolley prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    buyable::{Buyable, InstanceIdentifier},
    calculator::{Calculator, DefaultCalculator, Figures},
    cart::{Cart, CartBuilder, CartError, ItemSpec, UpdateSpec},
    catalog::{Catalog, CatalogRecord, UnknownModelError},
    config::{CartConfig, Format},
    coupons::{Coupon, CouponKind, coupon_total},
    events::{CartEvent, EventBus, NoopEventBus},
    item::{
        CartItem, ItemAttributes, ItemId, RowId, UnknownAttributeError, ValidationError,
    },
    memory::{MemorySessionStore, MemoryStorageGateway, RecordingEventBus, StaticCatalog},
    options::{ItemOptions, OptionValue},
    session::{Instance, SessionStore},
    shipping::{ShippingConfig, ShippingContext, shipping_total},
    storage::{CartSnapshot, SnapshotError, StorageGateway, StoredCart, SNAPSHOT_VERSION},
};
