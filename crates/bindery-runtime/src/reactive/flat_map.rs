#![forbid(unsafe_code)]

//! Switching projections: properties whose source is itself chosen by
//! another property.
//!
//! [`flat_map`] maps each value of an outer property to an inner property
//! and follows whichever inner property is current. When the outer value
//! changes, the old inner subscription is dropped as soon as the new one is
//! in place. [`flat_map_mutable`] does the same over [`Observable`]s and
//! writes through to the current inner value.
//!
//! # Invariants
//!
//! 1. Only the current inner property is subscribed; a replaced inner
//!    property never reaches the result again.
//! 2. Switching emits the new inner property's current value once.
//! 3. The outer link lives as long as any handle or subscription of the
//!    result.
//!
//! # Failure Modes
//!
//! - Mapper panic: propagates to whoever wrote the outer value; the previous
//!   inner subscription stays in place.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::observable::{Observable, Subscription};
use super::property::Property;

struct Switch<T> {
    value: Observable<T>,
    inner: RefCell<Subscription>,
    writable: RefCell<Option<Observable<T>>>,
}

impl<T: Clone + 'static> Switch<T> {
    fn new<P: Property<T>>(first: &P) -> Rc<Self> {
        let switch = Rc::new(Self {
            value: Observable::new(first.get()),
            inner: RefCell::new(Subscription::empty()),
            writable: RefCell::new(None),
        });
        switch.follow(first);
        switch
    }

    fn follow<P: Property<T>>(&self, inner: &P) {
        let target = self.value.clone();
        let sub = inner.listen(move |value: &T| target.set(value.clone()));
        // The old subscription is dropped after the borrow ends.
        let old = self.inner.replace(sub);
        drop(old);
    }

    fn switch_to<P: Property<T>>(&self, inner: &P) {
        self.follow(inner);
        self.value.set(inner.get());
    }
}

struct Link<T> {
    switch: Rc<Switch<T>>,
    _outer: Subscription,
}

fn link<T>(switch: &Rc<Switch<T>>, outer: Subscription) -> Rc<Link<T>> {
    Rc::new(Link {
        switch: Rc::clone(switch),
        _outer: outer,
    })
}

// ---------------------------------------------------------------------------
// FlatMapped<T>
// ---------------------------------------------------------------------------

/// Read-only result of [`flat_map`].
pub struct FlatMapped<T> {
    link: Rc<Link<T>>,
}

impl<T> Clone for FlatMapped<T> {
    fn clone(&self) -> Self {
        Self {
            link: Rc::clone(&self.link),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for FlatMapped<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FlatMapped")
            .field(&self.link.switch.value)
            .finish()
    }
}

impl<T: Clone + 'static> FlatMapped<T> {
    #[must_use]
    pub fn get(&self) -> T {
        self.link.switch.value.get()
    }
}

impl<T: Clone + 'static> Property<T> for FlatMapped<T> {
    fn get(&self) -> T {
        self.link.switch.value.get()
    }

    fn subscribe_shared(&self, callback: Rc<dyn Fn(&T)>) -> Subscription {
        self.link
            .switch
            .value
            .subscribe_rc(callback)
            .retaining(Rc::clone(&self.link))
    }
}

/// Follow the property `mapper` picks for each value of `source`.
///
/// ```
/// # use bindery_runtime::reactive::{Observable, flat_map};
/// let english = Observable::new(String::from("hello"));
/// let french = Observable::new(String::from("bonjour"));
/// let use_french = Observable::new(false);
///
/// let (en, fr) = (english.clone(), french.clone());
/// let greeting = flat_map(&use_french, move |f: &bool| if *f { fr.clone() } else { en.clone() });
/// assert_eq!(greeting.get(), "hello");
///
/// use_french.set(true);
/// assert_eq!(greeting.get(), "bonjour");
/// english.set(String::from("hi"));
/// assert_eq!(greeting.get(), "bonjour");
/// ```
pub fn flat_map<A, T, S, P>(source: &S, mapper: impl Fn(&A) -> P + 'static) -> FlatMapped<T>
where
    A: 'static,
    T: Clone + 'static,
    S: Property<A>,
    P: Property<T>,
{
    let switch = Switch::new(&mapper(&source.get()));
    let weak: Weak<Switch<T>> = Rc::downgrade(&switch);
    let outer = source.listen(move |a| {
        if let Some(switch) = weak.upgrade() {
            switch.switch_to(&mapper(a));
        }
    });
    FlatMapped {
        link: link(&switch, outer),
    }
}

// ---------------------------------------------------------------------------
// FlatMappedMut<T>
// ---------------------------------------------------------------------------

/// Writable result of [`flat_map_mutable`].
pub struct FlatMappedMut<T> {
    link: Rc<Link<T>>,
}

impl<T> Clone for FlatMappedMut<T> {
    fn clone(&self) -> Self {
        Self {
            link: Rc::clone(&self.link),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for FlatMappedMut<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FlatMappedMut")
            .field(&self.link.switch.value)
            .finish()
    }
}

impl<T: Clone + 'static> FlatMappedMut<T> {
    #[must_use]
    pub fn get(&self) -> T {
        self.link.switch.value.get()
    }

    /// Write `value` into the inner observable currently selected.
    pub fn set(&self, value: T) {
        let current = self.link.switch.writable.borrow().clone();
        if let Some(current) = current {
            current.set(value);
        }
    }

    /// The inner observable currently selected.
    #[must_use]
    pub fn current(&self) -> Option<Observable<T>> {
        self.link.switch.writable.borrow().clone()
    }
}

impl<T: Clone + 'static> Property<T> for FlatMappedMut<T> {
    fn get(&self) -> T {
        self.link.switch.value.get()
    }

    fn subscribe_shared(&self, callback: Rc<dyn Fn(&T)>) -> Subscription {
        self.link
            .switch
            .value
            .subscribe_rc(callback)
            .retaining(Rc::clone(&self.link))
    }
}

/// Like [`flat_map`] over observables; writes go to the current inner value.
pub fn flat_map_mutable<A, T, S>(
    source: &S,
    mapper: impl Fn(&A) -> Observable<T> + 'static,
) -> FlatMappedMut<T>
where
    A: 'static,
    T: Clone + 'static,
    S: Property<A>,
{
    let first = mapper(&source.get());
    let switch = Switch::new(&first);
    switch.writable.replace(Some(first));
    let weak: Weak<Switch<T>> = Rc::downgrade(&switch);
    let outer = source.listen(move |a| {
        if let Some(switch) = weak.upgrade() {
            let inner = mapper(a);
            switch.writable.replace(Some(inner.clone()));
            switch.switch_to(&inner);
        }
    });
    FlatMappedMut {
        link: link(&switch, outer),
    }
}
