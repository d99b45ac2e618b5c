#![forbid(unsafe_code)]

//! The [`Property`] abstraction shared by every value source.
//!
//! A property is a push stream whose latest value can be read synchronously.
//! View code accepts `impl Property<T>` so callers can hand it an
//! [`Observable`], a [`ReadProperty`], a [`Constant`], or a derived value.

use std::fmt;
use std::rc::Rc;

use super::observable::{Observable, Subscription};

/// A readable, observable value source.
pub trait Property<T>: 'static {
    /// The current value.
    fn get(&self) -> T;

    /// Register a shared callback for future values.
    fn subscribe_shared(&self, callback: Rc<dyn Fn(&T)>) -> Subscription;

    /// Register `callback` for future values.
    fn listen(&self, callback: impl Fn(&T) + 'static) -> Subscription
    where
        Self: Sized,
    {
        self.subscribe_shared(Rc::new(callback))
    }

    /// Register `callback` and deliver the current value to it first.
    fn listen_now(&self, callback: impl Fn(&T) + 'static) -> Subscription
    where
        Self: Sized,
    {
        let callback: Rc<dyn Fn(&T)> = Rc::new(callback);
        let sub = self.subscribe_shared(Rc::clone(&callback));
        callback(&self.get());
        sub
    }
}

impl<T: Clone + 'static> Property<T> for Observable<T> {
    fn get(&self) -> T {
        Observable::get(self)
    }

    fn subscribe_shared(&self, callback: Rc<dyn Fn(&T)>) -> Subscription {
        self.subscribe_rc(callback)
    }
}

// ---------------------------------------------------------------------------
// ReadProperty<T>
// ---------------------------------------------------------------------------

/// Read-only handle to an [`Observable`].
///
/// Handed to child factories so they can observe, but not write, the value
/// their cell holds.
pub struct ReadProperty<T> {
    source: Observable<T>,
}

impl<T> Clone for ReadProperty<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ReadProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadProperty").field(&self.source).finish()
    }
}

impl<T: Clone + 'static> ReadProperty<T> {
    pub(crate) fn new(source: Observable<T>) -> Self {
        Self { source }
    }

    #[must_use]
    pub fn get(&self) -> T {
        self.source.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.source.with(f)
    }

    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.source.subscribe(callback)
    }

    pub fn subscribe_now(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.source.subscribe_now(callback)
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.source.version()
    }
}

impl<T: Clone + 'static> Property<T> for ReadProperty<T> {
    fn get(&self) -> T {
        self.source.get()
    }

    fn subscribe_shared(&self, callback: Rc<dyn Fn(&T)>) -> Subscription {
        self.source.subscribe_rc(callback)
    }
}

// ---------------------------------------------------------------------------
// Constant<T>
// ---------------------------------------------------------------------------

/// A property that never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constant<T>(pub T);

impl<T: Clone + 'static> Property<T> for Constant<T> {
    fn get(&self) -> T {
        self.0.clone()
    }

    fn subscribe_shared(&self, _callback: Rc<dyn Fn(&T)>) -> Subscription {
        Subscription::empty()
    }
}
