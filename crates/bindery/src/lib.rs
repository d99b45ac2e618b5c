#![forbid(unsafe_code)]

//! bindery public facade crate.
//!
//! Ties observable values to nodes of a host view tree: one-way and two-way
//! bindings, index-keyed list rendering, and animated stack navigation.
//!
//! ```
//! use bindery::prelude::*;
//!
//! let tree = MemoryTree::new();
//! let items = Observable::new(vec![1, 2, 3]);
//! let list = ElementBuilder::new(&tree, "ul")
//!     .show_in(&items, |tree: &MemoryTree, n: ReadProperty<i32>| {
//!         ElementBuilder::new(tree, "li")
//!             .bind(BindingTarget::field("text"), &n)
//!             .build()
//!     })
//!     .build();
//! items.set(vec![3, 2]);
//! assert_eq!(tree.children_text(list, "text"), vec!["3", "2"]);
//! ```

pub use bindery_core as core;
pub use bindery_runtime as runtime;
pub use bindery_views as views;

pub use bindery_core::{BinderyConfig, BinderyError, Result};

pub mod prelude {
    pub use bindery_core::{
        BinderyConfig, BinderyError, DisposeBag, DisposeToken, Disposable, EventData,
        ManualScheduler, MemoryTree, NodeId, PropValue, Scheduler, StackConfig, SwapConfig,
        ViewTree,
    };
    pub use bindery_runtime::{
        BindingTarget, Constant, Observable, Property, ReadProperty, StackProperty, Subscription,
        bind, bind_action, bind_fallible, bind_mutable, chain, event_listener, flat_map,
        flat_map_mutable, has_class, map, map_reversible, reverse, throttled_event_listener,
        throttled_event_listener_with, view_exists, view_visible,
    };
    pub use bindery_views::{
        Direction, ElementBuilder, GeneratorHandle, ListView, SlotSwapper, StackSwapper,
        StackTransition, SwapContext, Transition, ViewGenerator, show_in, show_in_swap,
        show_in_typed,
    };
}
