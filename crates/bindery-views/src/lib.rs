#![forbid(unsafe_code)]

//! View composition for bindery.
//!
//! - [`list`]: index-keyed reconciliation of an array into child views.
//! - [`swap`]: animated replacement of a container's single child.
//! - [`transition`]: enter/exit animation presets.
//! - [`generator`]: deferred view constructors held by navigation stacks.
//! - [`stack_swap`]: showing the top of a navigation stack.
//! - [`element`]: declarative element construction.

pub mod element;
pub mod generator;
pub mod list;
pub mod stack_swap;
pub mod swap;
pub mod transition;

pub use element::ElementBuilder;
pub use generator::{EmptyView, GeneratorHandle, ViewGenerator};
pub use list::{ListReconciler, ListView, ReconcileStats, show_in, show_in_typed};
pub use stack_swap::{StackSwapper, select_transition, show_in_swap, show_in_swap_property};
pub use swap::{SlotSwapper, SwapContext, swap_views};
pub use transition::{Direction, StackTransition, Transition};
