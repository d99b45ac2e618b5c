#![forbid(unsafe_code)]

//! Push-based observable values.
//!
//! [`Observable<T>`] is a shared, version-tracked value cell. Every `set`
//! notifies subscribers synchronously on the caller's stack, including
//! writes made from inside a notification.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per write.
//! 2. Subscribers are notified in registration order.
//! 3. A canceled [`Subscription`] receives nothing after `cancel` returns,
//!    even when the cancel happens in the middle of a notification cycle.
//! 4. Subscribers added during a notification first hear the next write.
//! 5. No borrow of the cell is held while callbacks run.
//!
//! # Failure Modes
//!
//! - Callback panic: propagates to the writer. The value and version are
//!   already updated; remaining subscribers of that cycle are skipped.
//! - Subscription dropped inside `with`: the slot cannot be removed while
//!   the value is borrowed, so it is only marked dead and pruned on the next
//!   notification.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use bindery_core::dispose::Disposable;

type Callback<T> = Rc<dyn Fn(&T)>;

struct Slot<T> {
    id: u64,
    alive: Rc<Cell<bool>>,
    callback: Callback<T>,
}

struct ObservableInner<T> {
    value: T,
    version: u64,
    slots: Vec<Slot<T>>,
    next_id: u64,
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Cancel handle for a subscriber. Dropping it unsubscribes.
pub struct Subscription {
    state: Option<(Rc<Cell<bool>>, Box<dyn FnOnce()>)>,
}

impl Subscription {
    fn new(alive: Rc<Cell<bool>>, detach: impl FnOnce() + 'static) -> Self {
        Self {
            state: Some((alive, Box::new(detach))),
        }
    }

    /// A subscription to a source that never emits.
    #[must_use]
    pub fn empty() -> Self {
        Self { state: None }
    }

    /// Keep `owner` alive until this subscription is canceled.
    ///
    /// Derived values hand out subscriptions on an internal observable; the
    /// link feeding that observable must live as long as any subscriber.
    #[must_use]
    pub fn retaining<O: 'static>(mut self, owner: O) -> Self {
        let Some((alive, detach)) = self.state.take() else {
            return self;
        };
        Self::new(alive, move || {
            detach();
            drop(owner);
        })
    }

    /// Whether the subscriber is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.as_ref().is_some_and(|(alive, _)| alive.get())
    }

    /// Stop delivery immediately. Idempotent.
    pub fn cancel(&mut self) {
        if let Some((alive, detach)) = self.state.take() {
            alive.set(false);
            detach();
        }
    }
}

impl Disposable for Subscription {
    fn dispose(&mut self) {
        self.cancel();
    }

    fn is_disposed(&self) -> bool {
        self.state.is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Observable<T>
// ---------------------------------------------------------------------------

/// A mutable, observable value.
///
/// Cloning an `Observable` yields another handle to the **same** value.
///
/// ```
/// # use std::rc::Rc;
/// # use std::cell::Cell;
/// # use bindery_runtime::reactive::Observable;
/// let count = Observable::new(0);
/// let seen = Rc::new(Cell::new(0));
/// let s = Rc::clone(&seen);
/// let _sub = count.subscribe(move |v| s.set(*v));
/// count.set(5);
/// assert_eq!(seen.get(), 5);
/// ```
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("Observable")
                .field("value", &inner.value)
                .field("version", &inner.version)
                .field("subscribers", &inner.slots.len())
                .finish(),
            Err(_) => f.debug_struct("Observable").finish_non_exhaustive(),
        }
    }
}

impl<T: Default + Clone + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                slots: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value.
    ///
    /// Writing to the same observable from inside `f` panics.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Store `value` and notify every subscriber.
    pub fn set(&self, value: T) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.value = value.clone();
            inner.version += 1;
        }
        self.emit(&value);
    }

    /// Store and notify only when `value` differs from the current value.
    ///
    /// Returns whether a write happened.
    pub fn set_if_changed(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        if self.inner.borrow().value == value {
            return false;
        }
        self.set(value);
        true
    }

    /// Mutate the value in place, then notify.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let value = {
            let mut inner = self.inner.borrow_mut();
            f(&mut inner.value);
            inner.version += 1;
            inner.value.clone()
        };
        self.emit(&value);
    }

    /// Re-emit the current value without changing it.
    pub fn notify(&self) {
        let value = self.get();
        self.emit(&value);
    }

    /// Register `callback` for future writes.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.subscribe_rc(Rc::new(callback))
    }

    /// Register `callback` and call it with the current value right away.
    pub fn subscribe_now(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let callback: Callback<T> = Rc::new(callback);
        let sub = self.subscribe_rc(Rc::clone(&callback));
        let current = self.get();
        callback(&current);
        sub
    }

    pub(crate) fn subscribe_rc(&self, callback: Callback<T>) -> Subscription {
        let alive = Rc::new(Cell::new(true));
        let id = {
            let mut inner = self.inner.borrow_mut();
            inner.next_id += 1;
            let id = inner.next_id;
            inner.slots.push(Slot {
                id,
                alive: Rc::clone(&alive),
                callback,
            });
            id
        };
        let weak: Weak<RefCell<ObservableInner<T>>> = Rc::downgrade(&self.inner);
        Subscription::new(alive, move || {
            if let Some(inner) = weak.upgrade()
                && let Ok(mut inner) = inner.try_borrow_mut()
            {
                inner.slots.retain(|slot| slot.id != id);
            }
        })
    }

    /// Number of writes so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .borrow()
            .slots
            .iter()
            .filter(|slot| slot.alive.get())
            .count()
    }

    /// Drop every subscriber. Their subscriptions become inert.
    pub fn clear_subscribers(&self) {
        let slots = std::mem::take(&mut self.inner.borrow_mut().slots);
        for slot in &slots {
            slot.alive.set(false);
        }
    }

    /// A read-only view of this value.
    #[must_use]
    pub fn read_only(&self) -> super::ReadProperty<T> {
        super::ReadProperty::new(self.clone())
    }

    /// Whether two handles share the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn emit(&self, value: &T) {
        let targets: Vec<(Rc<Cell<bool>>, Callback<T>)> = {
            let mut inner = self.inner.borrow_mut();
            inner.slots.retain(|slot| slot.alive.get());
            inner
                .slots
                .iter()
                .map(|slot| (Rc::clone(&slot.alive), Rc::clone(&slot.callback)))
                .collect()
        };
        for (alive, callback) in targets {
            if alive.get() {
                callback(value);
            }
        }
    }
}
