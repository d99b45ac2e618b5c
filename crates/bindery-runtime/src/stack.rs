#![forbid(unsafe_code)]

//! An observable navigation stack.
//!
//! [`StackProperty<T>`] holds an ordered sequence (bottom first) and emits
//! the whole sequence after every successful mutation. The stack-driven
//! swapper in `bindery-views` watches it and shows the top element.
//!
//! # Invariants
//!
//! 1. `pop` never takes the stack below one element.
//! 2. `dismiss` may empty the stack.
//! 3. Every successful operation emits exactly once; failed operations
//!    (`pop` on one element, `dismiss` on empty, `pop_to` on an absent
//!    target) change nothing and emit nothing.
//! 4. The current item is the last element.
//!
//! # Failure Modes
//!
//! None: operations report rejection through their `bool` result.

use std::fmt;
use std::rc::Rc;

use crate::reactive::{Observable, Property, ReadProperty, Subscription};

/// Observable stack of items, typically view generators.
pub struct StackProperty<T> {
    items: Observable<Vec<T>>,
}

impl<T> Clone for StackProperty<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

impl<T: Clone + 'static> Default for StackProperty<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for StackProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StackProperty").field(&self.items).finish()
    }
}

impl<T: Clone + 'static> StackProperty<T> {
    /// An empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Observable::new(Vec::new()),
        }
    }

    /// A stack holding `root` only.
    pub fn with_root(root: T) -> Self {
        Self {
            items: Observable::new(vec![root]),
        }
    }

    /// Snapshot of the stack, bottom first.
    #[must_use]
    pub fn items(&self) -> Vec<T> {
        self.items.get()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.with(Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.with(Vec::is_empty)
    }

    /// The current (top) item.
    #[must_use]
    pub fn top(&self) -> Option<T> {
        self.items.with(|items| items.last().cloned())
    }

    pub fn push(&self, item: T) {
        self.items.update(|items| items.push(item));
        tracing::trace!(message = "stack.push", len = self.len());
    }

    /// Replace the top item; pushes when the stack is empty.
    pub fn swap(&self, item: T) {
        self.items.update(|items| {
            items.pop();
            items.push(item);
        });
        tracing::trace!(message = "stack.replace_top", len = self.len());
    }

    /// Remove the top item unless it is the last one.
    pub fn pop(&self) -> bool {
        if self.len() <= 1 {
            return false;
        }
        self.items.update(|items| {
            items.pop();
        });
        tracing::trace!(message = "stack.pop", len = self.len());
        true
    }

    /// Remove the top item, possibly emptying the stack.
    pub fn dismiss(&self) -> bool {
        if self.is_empty() {
            return false;
        }
        self.items.update(|items| {
            items.pop();
        });
        tracing::trace!(message = "stack.dismiss", len = self.len());
        true
    }

    /// Remove everything above the first matching item (searching from the
    /// bottom). Returns `false` when nothing matches.
    pub fn pop_to_predicate(&self, predicate: impl Fn(&T) -> bool) -> bool {
        let Some(index) = self.items.with(|items| items.iter().position(&predicate)) else {
            return false;
        };
        self.items.update(|items| items.truncate(index + 1));
        tracing::trace!(message = "stack.pop_to", len = index + 1);
        true
    }

    /// Remove everything above the first occurrence of `item`.
    pub fn pop_to(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.pop_to_predicate(|candidate| candidate == item)
    }

    /// Pop back to the bottom item. Returns `false` on an empty stack.
    pub fn root(&self) -> bool {
        if self.is_empty() {
            return false;
        }
        self.items.update(|items| items.truncate(1));
        tracing::trace!(message = "stack.root");
        true
    }

    /// Replace the whole stack with `[item]`.
    pub fn reset(&self, item: T) {
        self.items.set(vec![item]);
        tracing::trace!(message = "stack.reset");
    }

    /// Re-emit the current sequence unchanged.
    pub fn notify(&self) {
        self.items.notify();
    }

    /// Observe the stack read-only.
    #[must_use]
    pub fn read_only(&self) -> ReadProperty<Vec<T>> {
        self.items.read_only()
    }

    pub fn subscribe(&self, callback: impl Fn(&Vec<T>) + 'static) -> Subscription {
        self.items.subscribe(callback)
    }
}

impl<T: Clone + 'static> Property<Vec<T>> for StackProperty<T> {
    fn get(&self) -> Vec<T> {
        self.items.get()
    }

    fn subscribe_shared(&self, callback: Rc<dyn Fn(&Vec<T>)>) -> Subscription {
        self.items.subscribe_shared(callback)
    }
}
