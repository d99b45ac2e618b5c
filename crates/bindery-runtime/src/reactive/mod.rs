#![forbid(unsafe_code)]

//! Reactive values for bindery.
//!
//! - [`Observable`]: shared, version-tracked mutable value that notifies
//!   subscribers synchronously on every write.
//! - [`Subscription`]: cancel handle; dropping or disposing it unsubscribes.
//! - [`Property`]: anything readable and observable. Implemented by
//!   [`Observable`], [`ReadProperty`], [`Constant`], [`Derived`],
//!   [`Projection`], [`FlatMapped`] and [`FlatMappedMut`].
//! - [`map`], [`map_reversible`], [`flat_map`], [`flat_map_mutable`]:
//!   properties computed from other properties.
//!
//! # Architecture
//!
//! Everything is single-threaded: values live in `Rc<RefCell<..>>` and each
//! subscriber slot carries an `Rc<Cell<bool>>` liveness flag. Notification
//! snapshots the live slots, releases the borrow, then calls each callback
//! whose flag is still set.
//!
//! # Invariants
//!
//! 1. Writes notify synchronously, including writes made by a subscriber.
//! 2. Subscribers are notified in registration order.
//! 3. No callback runs after its subscription was canceled.
//! 4. No `RefCell` borrow is held while user callbacks run.
//! 5. A subscription to a derived value keeps its upstream links alive.

use std::cell::Cell;

pub mod derived;
pub mod flat_map;
pub mod observable;
pub mod property;

pub use derived::{Derived, Projection, map, map_reversible};
pub use flat_map::{FlatMapped, FlatMappedMut, flat_map, flat_map_mutable};
pub use observable::{Observable, Subscription};
pub use property::{Constant, Property, ReadProperty};

/// Holds a suppression flag raised until dropped, unwinding included.
pub(crate) struct Suppressed<'a>(&'a Cell<bool>);

impl<'a> Suppressed<'a> {
    /// Raise `flag`, or `None` when it is already raised.
    pub(crate) fn raise(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            return None;
        }
        Some(Self(flag))
    }
}

impl Drop for Suppressed<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}
