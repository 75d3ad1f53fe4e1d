//! Cart Events
//!
//! Typed lifecycle notifications published by the cart. Publication is
//! fire-and-forget; no return value is consumed and a failing subscriber
//! must not affect the cart operation.

use std::fmt;

use crate::item::CartItem;

/// A cart lifecycle event.
///
/// Mutation events carry the resulting line; the persistence-protocol
/// events carry no payload.
#[derive(Debug, Clone, PartialEq)]
pub enum CartEvent {
    /// A line is about to be written to the session.
    Adding(CartItem),

    /// A line was written to the session.
    Added(CartItem),

    /// A line update is about to be written to the session.
    Updating(CartItem),

    /// A line update was written to the session.
    Updated(CartItem),

    /// A line removal is about to be written to the session.
    Removing(CartItem),

    /// A line removal was written to the session.
    Removed(CartItem),

    /// The cart content was stored durably.
    Stored,

    /// A stored cart was restored into the session.
    Restored,

    /// A stored cart was merged into the live cart.
    Merged,

    /// A stored cart was erased without touching live content.
    Erased,
}

impl CartEvent {
    /// Stable event name, usable as a routing key.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            CartEvent::Adding(_) => "adding",
            CartEvent::Added(_) => "added",
            CartEvent::Updating(_) => "updating",
            CartEvent::Updated(_) => "updated",
            CartEvent::Removing(_) => "removing",
            CartEvent::Removed(_) => "removed",
            CartEvent::Stored => "stored",
            CartEvent::Restored => "restored",
            CartEvent::Merged => "merged",
            CartEvent::Erased => "erased",
        }
    }

    /// The line carried by the event, if any.
    #[must_use]
    pub fn item(&self) -> Option<&CartItem> {
        match self {
            CartEvent::Adding(item)
            | CartEvent::Added(item)
            | CartEvent::Updating(item)
            | CartEvent::Updated(item)
            | CartEvent::Removing(item)
            | CartEvent::Removed(item) => Some(item),
            CartEvent::Stored | CartEvent::Restored | CartEvent::Merged | CartEvent::Erased => None,
        }
    }
}

/// Fire-and-forget event publication capability.
pub trait EventBus: fmt::Debug {
    /// Publishes an event. Implementations must not fail the caller.
    fn publish(&self, event: CartEvent);
}

/// An event bus that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventBus;

impl EventBus for NoopEventBus {
    fn publish(&self, _event: CartEvent) {}
}
