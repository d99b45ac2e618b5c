#![forbid(unsafe_code)]

//! Error type and the global error hook.
//!
//! Most of bindery cannot fail: stack operations report invariant violations
//! through `bool` returns and the reconciler assumes well-behaved factories.
//! What remains (value sources that fail, unreadable binding targets, panics
//! during a disposal drain) is escalated through [`report`], which logs the
//! error and then hands it to the hook installed with [`set_error_hook`].
//!
//! # Invariants
//!
//! 1. [`report`] always logs, even when no hook is installed.
//! 2. The hook is thread-local; every UI thread installs its own.
//! 3. A hook that reports again from inside itself does not recurse; the
//!    nested report is logged only.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use thiserror::Error;

/// Convenience alias used across bindery crates.
pub type Result<T> = std::result::Result<T, BinderyError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BinderyError {
    /// A bound value source delivered an error instead of a value.
    #[error("value source `{source_name}` failed: {message}")]
    SourceFailed {
        source_name: String,
        message: String,
    },

    /// A two-way binding was requested against a write-only target.
    #[error("binding target `{target}` cannot be read back")]
    UnreadableTarget { target: String },

    /// One or more disposal actions panicked while a node was drained.
    #[error("{count} disposal action(s) panicked while draining a node")]
    DisposalPanicked { count: usize },

    /// The host tree does not know the node.
    #[error("unknown node: {node}")]
    UnknownNode { node: String },

    /// Configuration could not be parsed.
    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl BinderyError {
    #[must_use]
    pub fn source_failed(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceFailed {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

type Hook = Rc<dyn Fn(&BinderyError)>;

thread_local! {
    static ERROR_HOOK: RefCell<Option<Hook>> = const { RefCell::new(None) };
    static REPORTING: Cell<bool> = const { Cell::new(false) };
}

/// Install the thread-local error hook, returning the previous one.
pub fn set_error_hook(hook: impl Fn(&BinderyError) + 'static) -> Option<Rc<dyn Fn(&BinderyError)>> {
    ERROR_HOOK.with(|slot| slot.borrow_mut().replace(Rc::new(hook)))
}

/// Remove the thread-local error hook.
pub fn clear_error_hook() -> Option<Rc<dyn Fn(&BinderyError)>> {
    ERROR_HOOK.with(|slot| slot.borrow_mut().take())
}

/// Log `error` and forward it to the installed hook, if any.
pub fn report(error: &BinderyError) {
    tracing::error!(message = "bindery.error", error = %error);

    if REPORTING.with(Cell::get) {
        return;
    }
    let hook = ERROR_HOOK.with(|slot| slot.borrow().clone());
    if let Some(hook) = hook {
        let _reporting = ReportingGuard::enter();
        hook(error);
    }
}

/// Clears the re-entrancy flag even if the hook unwinds.
struct ReportingGuard;

impl ReportingGuard {
    fn enter() -> Self {
        REPORTING.with(|flag| flag.set(true));
        Self
    }
}

impl Drop for ReportingGuard {
    fn drop(&mut self) {
        REPORTING.with(|flag| flag.set(false));
    }
}
