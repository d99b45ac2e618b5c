#![forbid(unsafe_code)]

//! Core primitives for bindery.
//!
//! - [`tree`]: the [`ViewTree`] host abstraction.
//! - [`memory`]: [`MemoryTree`], an arena-backed host with a mutation journal.
//! - [`dispose`]: disposal tokens and the node-keyed [`DisposalRegistry`].
//! - [`timer`]: the [`Scheduler`] used for animation fallbacks and debouncing.
//! - [`error`]: [`BinderyError`] and the thread-local error hook.
//! - [`config`]: swap and stack timing.

pub mod config;
pub mod dispose;
pub mod error;
pub mod memory;
pub mod timer;
pub mod tree;

pub use config::{BinderyConfig, StackConfig, SwapConfig};
pub use dispose::{
    DisposalRegistry, Disposable, DisposeBag, DisposeCondition, DisposeToken, RegistryStats,
    dispose_all, dispose_any,
};
pub use error::{BinderyError, Result};
pub use memory::{MemoryTree, Mutation, NodeId};
pub use timer::{InstantScheduler, ManualScheduler, Scheduler, Task, TimerGuard, TimerId};
pub use tree::{
    ANIMATION_END, EventData, FromPropValue, Listener, ListenerGuard, ListenerId, PropValue,
    ViewTree,
};
