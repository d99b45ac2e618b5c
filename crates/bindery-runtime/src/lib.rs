#![forbid(unsafe_code)]

//! Reactive runtime for bindery.
//!
//! - [`reactive`]: observables, properties, derived and switching values.
//! - [`stack`]: the observable navigation stack.
//! - [`bind`]: bindings between properties and tree nodes.

pub mod bind;
pub mod reactive;
pub mod stack;

pub use bind::{
    BindingTarget, DEFAULT_THROTTLE, VirtualProperty, bind, bind_action, bind_fallible,
    bind_mutable, chain, event_listener, has_class, reverse, throttled_event_listener,
    throttled_event_listener_with, view_exists, view_visible,
};
pub use reactive::{
    Constant, Derived, FlatMapped, FlatMappedMut, Observable, Projection, Property, ReadProperty,
    Subscription, flat_map, flat_map_mutable, map, map_reversible,
};
pub use stack::StackProperty;
