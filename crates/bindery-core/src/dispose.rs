#![forbid(unsafe_code)]

//! Disposal tokens and the node-keyed disposal registry.
//!
//! Every subscription, listener, or timer handed out by bindery is a
//! [`Disposable`]. Tokens that should live as long as a tree node are moved
//! into the host's [`DisposalRegistry`], which cancels them when the node is
//! detached.
//!
//! # Invariants
//!
//! 1. A node has at most one registry entry, created lazily by `register`.
//! 2. An entry is removed from the table *before* its tokens run, so a
//!    second detach of the same node is a no-op and tokens may safely
//!    register new work while being drained.
//! 3. `node_removed` drains the node and every descendant reported by the
//!    `children` callback; no entry is visited twice in one walk.
//! 4. Disposing a token twice is a no-op.
//!
//! # Failure Modes
//!
//! - A disposal action panics: the remaining tokens of the same walk still
//!   run, then `BinderyError::DisposalPanicked` is reported and the first
//!   panic resumes.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};

use crate::error::{self, BinderyError};

/// A cancelable handle for an active subscription, listener, or timer.
pub trait Disposable {
    /// Cancel the underlying resource. Must be idempotent.
    fn dispose(&mut self);

    /// Whether `dispose` has already run.
    fn is_disposed(&self) -> bool;
}

impl<D: Disposable + ?Sized> Disposable for Box<D> {
    fn dispose(&mut self) {
        (**self).dispose();
    }

    fn is_disposed(&self) -> bool {
        (**self).is_disposed()
    }
}

// ---------------------------------------------------------------------------
// DisposeToken
// ---------------------------------------------------------------------------

/// A token wrapping a one-shot cleanup closure.
pub struct DisposeToken {
    action: Option<Box<dyn FnOnce()>>,
}

impl DisposeToken {
    /// Create a token that runs `action` when disposed.
    pub fn new(action: impl FnOnce() + 'static) -> Self {
        Self {
            action: Some(Box::new(action)),
        }
    }

    /// Adapt any disposable into a token.
    pub fn from_disposable(mut inner: impl Disposable + 'static) -> Self {
        Self::new(move || inner.dispose())
    }

    /// A token with nothing to release.
    #[must_use]
    pub fn noop() -> Self {
        Self { action: None }
    }

    /// Move the pending action out, leaving a disposed token behind.
    #[must_use]
    pub fn take(&mut self) -> Self {
        std::mem::replace(self, Self::noop())
    }
}

impl Disposable for DisposeToken {
    fn dispose(&mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }

    fn is_disposed(&self) -> bool {
        self.action.is_none()
    }
}

impl fmt::Debug for DisposeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposeToken")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// DisposeBag
// ---------------------------------------------------------------------------

/// An ordered collection of tokens disposed together.
///
/// Once the bag is disposed, tokens pushed into it are disposed immediately.
#[derive(Default)]
pub struct DisposeBag {
    parts: Vec<Box<dyn Disposable>>,
    disposed: bool,
}

impl DisposeBag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: impl Disposable + 'static) {
        let mut token: Box<dyn Disposable> = Box::new(token);
        if self.disposed {
            token.dispose();
        } else {
            self.parts.push(token);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Dispose every token, continuing past panics.
    ///
    /// Returns the number of tokens disposed and the panic payloads caught.
    fn dispose_catching(&mut self) -> (usize, Vec<Box<dyn Any + Send>>) {
        self.disposed = true;
        let parts = std::mem::take(&mut self.parts);
        let count = parts.len();
        let mut panics = Vec::new();
        for mut part in parts {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| part.dispose())) {
                panics.push(payload);
            }
        }
        (count, panics)
    }
}

impl Disposable for DisposeBag {
    fn dispose(&mut self) {
        let (_, panics) = self.dispose_catching();
        escalate(panics);
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl fmt::Debug for DisposeBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposeBag")
            .field("len", &self.parts.len())
            .field("disposed", &self.disposed)
            .finish()
    }
}

fn escalate(mut panics: Vec<Box<dyn Any + Send>>) {
    if panics.is_empty() {
        return;
    }
    error::report(&BinderyError::DisposalPanicked {
        count: panics.len(),
    });
    panic::resume_unwind(panics.swap_remove(0));
}

// ---------------------------------------------------------------------------
// Dispose conditions
// ---------------------------------------------------------------------------

/// Something that takes ownership of a token and disposes it later.
pub type DisposeCondition = Box<dyn FnOnce(DisposeToken)>;

/// Dispose `token` when the first of `conditions` fires.
pub fn dispose_any(conditions: Vec<DisposeCondition>) -> DisposeCondition {
    Box::new(move |token| {
        let shared = Rc::new(RefCell::new(token));
        for condition in conditions {
            let shared = Rc::clone(&shared);
            condition(DisposeToken::new(move || {
                let mut token = shared.borrow_mut().take();
                token.dispose();
            }));
        }
    })
}

/// Dispose `token` only after every one of `conditions` fired.
pub fn dispose_all(conditions: Vec<DisposeCondition>) -> DisposeCondition {
    Box::new(move |token| {
        if conditions.is_empty() {
            let mut token = token;
            token.dispose();
            return;
        }
        let remaining = Rc::new(Cell::new(conditions.len()));
        let shared = Rc::new(RefCell::new(token));
        for condition in conditions {
            let remaining = Rc::clone(&remaining);
            let shared = Rc::clone(&shared);
            condition(DisposeToken::new(move || {
                remaining.set(remaining.get() - 1);
                if remaining.get() == 0 {
                    let mut token = shared.borrow_mut().take();
                    token.dispose();
                }
            }));
        }
    })
}

// ---------------------------------------------------------------------------
// DisposalRegistry
// ---------------------------------------------------------------------------

/// Counters describing registry activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    /// Entries currently holding tokens.
    pub live_entries: usize,
    /// Entries drained since creation.
    pub drained_entries: u64,
    /// Tokens disposed by drains since creation.
    pub disposed_tokens: u64,
}

struct RegistryInner<K> {
    entries: AHashMap<K, DisposeBag>,
    drained_entries: u64,
    disposed_tokens: u64,
}

/// Per-node ownership lists for disposal tokens.
///
/// Cloning yields another handle to the same table.
pub struct DisposalRegistry<K> {
    inner: Rc<RefCell<RegistryInner<K>>>,
}

impl<K> Clone for DisposalRegistry<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<K: Clone + Eq + Hash + fmt::Debug> Default for DisposalRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Eq + Hash + fmt::Debug> DisposalRegistry<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(RegistryInner {
                entries: AHashMap::new(),
                drained_entries: 0,
                disposed_tokens: 0,
            })),
        }
    }

    /// Append `token` to `node`'s entry, creating the entry if needed.
    pub fn register(&self, node: &K, token: impl Disposable + 'static) {
        self.inner
            .borrow_mut()
            .entries
            .entry(node.clone())
            .or_default()
            .push(token);
    }

    /// A condition that hands tokens to `node`'s entry.
    pub fn when_removed(&self, node: &K) -> DisposeCondition
    where
        K: 'static,
    {
        let registry = self.clone();
        let node = node.clone();
        Box::new(move |token| registry.register(&node, token))
    }

    /// Number of tokens waiting on `node`.
    #[must_use]
    pub fn pending(&self, node: &K) -> usize {
        self.inner
            .borrow()
            .entries
            .get(node)
            .map_or(0, DisposeBag::len)
    }

    /// Whether `node` currently has an entry.
    #[must_use]
    pub fn contains(&self, node: &K) -> bool {
        self.inner.borrow().entries.contains_key(node)
    }

    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        let inner = self.inner.borrow();
        RegistryStats {
            live_entries: inner.entries.len(),
            drained_entries: inner.drained_entries,
            disposed_tokens: inner.disposed_tokens,
        }
    }

    /// Drain `node`'s own entry. Returns the number of tokens disposed.
    pub fn drain(&self, node: &K) -> usize {
        let (count, panics) = self.drain_one(node);
        escalate(panics);
        count
    }

    /// Drain `node` and every descendant reported by `children`.
    ///
    /// Returns the number of tokens disposed across the whole subtree.
    pub fn node_removed(&self, node: &K, children: impl Fn(&K) -> Vec<K>) -> usize {
        let mut visited: AHashSet<K> = AHashSet::new();
        let mut pending = vec![node.clone()];
        let mut total = 0;
        let mut panics = Vec::new();

        while let Some(current) = pending.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            let (count, mut caught) = self.drain_one(&current);
            total += count;
            panics.append(&mut caught);
            pending.extend(children(&current));
        }

        escalate(panics);
        total
    }

    fn drain_one(&self, node: &K) -> (usize, Vec<Box<dyn Any + Send>>) {
        let Some(mut bag) = self.inner.borrow_mut().entries.remove(node) else {
            return (0, Vec::new());
        };
        let (count, panics) = bag.dispose_catching();
        {
            let mut inner = self.inner.borrow_mut();
            inner.drained_entries += 1;
            inner.disposed_tokens += count as u64;
        }
        tracing::trace!(message = "registry.drain", node = ?node, tokens = count);
        (count, panics)
    }
}

impl<K> fmt::Debug for DisposalRegistry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("DisposalRegistry")
            .field("entries", &inner.entries.len())
            .field("drained_entries", &inner.drained_entries)
            .finish()
    }
}
