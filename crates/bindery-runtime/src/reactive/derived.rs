#![forbid(unsafe_code)]

//! Properties derived from other properties.
//!
//! - [`map`]: read-only projection, recomputed eagerly on every source
//!   emission.
//! - [`map_reversible`]: two-way projection of an [`Observable`]; writes to
//!   the projection are mapped back into the source.
//!
//! # Invariants
//!
//! 1. A derived value is always `f(source)` for the source's latest emission.
//! 2. The link to the source lives as long as any handle of the derived
//!    value or any subscription to it; dropping the last one unsubscribes.
//! 3. A reversible projection never echoes a write back to its origin: one
//!    suppression flag guards both directions.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use super::Suppressed;
use super::observable::{Observable, Subscription};
use super::property::Property;

// ---------------------------------------------------------------------------
// Derived<T>
// ---------------------------------------------------------------------------

/// A read-only value computed from a source property.
pub struct Derived<T> {
    value: Observable<T>,
    _link: Rc<Subscription>,
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            _link: Rc::clone(&self._link),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Derived").field(&self.value).finish()
    }
}

impl<T: Clone + 'static> Derived<T> {
    #[must_use]
    pub fn get(&self) -> T {
        self.value.get()
    }

    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.subscribe_shared(Rc::new(callback))
    }
}

impl<T: Clone + 'static> Property<T> for Derived<T> {
    fn get(&self) -> T {
        self.value.get()
    }

    fn subscribe_shared(&self, callback: Rc<dyn Fn(&T)>) -> Subscription {
        self.value
            .subscribe_rc(callback)
            .retaining(Rc::clone(&self._link))
    }
}

/// Project `source` through `f`.
///
/// ```
/// # use bindery_runtime::reactive::{Observable, derived::map};
/// let count = Observable::new(2);
/// let label = map(&count, |c: &i32| format!("{c} items"));
/// count.set(3);
/// assert_eq!(label.get(), "3 items");
/// ```
pub fn map<S, T, P>(source: &P, f: impl Fn(&S) -> T + 'static) -> Derived<T>
where
    S: 'static,
    T: Clone + 'static,
    P: Property<S>,
{
    let value = Observable::new(f(&source.get()));
    let target = value.clone();
    let link = source.listen(move |s| target.set(f(s)));
    Derived {
        value,
        _link: Rc::new(link),
    }
}

// ---------------------------------------------------------------------------
// Projection<B>
// ---------------------------------------------------------------------------

/// A two-way projection of an [`Observable`].
pub struct Projection<T> {
    value: Observable<T>,
    _links: Rc<(Subscription, Subscription)>,
}

impl<T> Clone for Projection<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            _links: Rc::clone(&self._links),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Projection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Projection").field(&self.value).finish()
    }
}

impl<T: Clone + 'static> Projection<T> {
    #[must_use]
    pub fn get(&self) -> T {
        self.value.get()
    }

    /// Write through to the source.
    pub fn set(&self, value: T) {
        self.value.set(value);
    }

    /// The projected observable. Its link to the source lives only as long
    /// as this projection (or a clone) does.
    #[must_use]
    pub fn observable(&self) -> &Observable<T> {
        &self.value
    }
}

impl<T: Clone + 'static> Property<T> for Projection<T> {
    fn get(&self) -> T {
        self.value.get()
    }

    fn subscribe_shared(&self, callback: Rc<dyn Fn(&T)>) -> Subscription {
        self.value
            .subscribe_rc(callback)
            .retaining(Rc::clone(&self._links))
    }
}

/// Two-way projection: reads go through `forward`, writes through `reverse`.
///
/// `reverse` returns `None` when a written value has no source equivalent
/// (for example unparsable text); such writes are dropped.
pub fn map_reversible<A, B>(
    source: &Observable<A>,
    forward: impl Fn(&A) -> B + 'static,
    reverse: impl Fn(&B) -> Option<A> + 'static,
) -> Projection<B>
where
    A: Clone + 'static,
    B: Clone + 'static,
{
    let value = Observable::new(source.with(&forward));
    let suppress = Rc::new(Cell::new(false));

    let down = {
        let target = value.clone();
        let suppress = Rc::clone(&suppress);
        source.subscribe(move |a| {
            let Some(_held) = Suppressed::raise(&suppress) else {
                return;
            };
            target.set(forward(a));
        })
    };
    let up = {
        let origin = source.clone();
        let suppress = Rc::clone(&suppress);
        value.subscribe(move |b| {
            let Some(_held) = Suppressed::raise(&suppress) else {
                return;
            };
            if let Some(a) = reverse(b) {
                origin.set(a);
            }
        })
    };

    Projection {
        value,
        _links: Rc::new((down, up)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn map_tracks_source() {
        let source = Observable::new(2);
        let doubled = map(&source, |v: &i32| v * 2);
        assert_eq!(doubled.get(), 4);
        source.set(5);
        assert_eq!(doubled.get(), 10);
    }

    #[test]
    fn map_unsubscribes_with_last_handle() {
        let source = Observable::new(0);
        let derived = map(&source, |v: &i32| *v);
        let clone = derived.clone();
        assert_eq!(source.subscriber_count(), 1);
        drop(derived);
        assert_eq!(source.subscriber_count(), 1);
        drop(clone);
        assert_eq!(source.subscriber_count(), 0);
    }

    #[test]
    fn subscription_keeps_temporary_map_alive() {
        let count = Observable::new(1);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let sub = map(&count, |c: &i32| format!("n={c}"))
            .listen_now(move |v: &String| s.borrow_mut().push(v.clone()));

        count.set(2);
        count.set(3);
        assert_eq!(*seen.borrow(), vec!["n=1", "n=2", "n=3"]);
        assert_eq!(count.subscriber_count(), 1);

        drop(sub);
        assert_eq!(count.subscriber_count(), 0, "link released with the last subscriber");
    }

    #[test]
    fn subscription_keeps_temporary_projection_alive() {
        let number = Observable::new(1);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = map_reversible(&number, |n: &i32| n * 10, |t: &i32| Some(t / 10))
            .listen(move |v| s.borrow_mut().push(*v));
        number.set(4);
        assert_eq!(*seen.borrow(), vec![40]);
    }

    #[test]
    fn map_of_map() {
        let source = Observable::new(1);
        let a = map(&source, |v: &i32| v + 1);
        let b = map(&a, |v: &i32| v * 10);
        source.set(4);
        assert_eq!(b.get(), 50);
    }

    #[test]
    fn reversible_round_trip_without_echo() {
        let number = Observable::new(3);
        let text = map_reversible(&number, |n| n.to_string(), |s: &String| s.parse().ok());
        assert_eq!(text.get(), "3");

        let writes = Rc::new(Cell::new(0));
        let w = Rc::clone(&writes);
        let _sub = number.subscribe(move |_| w.set(w.get() + 1));

        text.set("42".to_string());
        assert_eq!(number.get(), 42);
        assert_eq!(writes.get(), 1, "one write reaches the source");
        assert_eq!(text.get(), "42");

        number.set(7);
        assert_eq!(text.get(), "7");
    }

    #[test]
    fn reversible_drops_unmappable_writes() {
        let number = Observable::new(1);
        let text = map_reversible(&number, |n: &i32| n.to_string(), |s: &String| s.parse().ok());
        text.set("nope".to_string());
        assert_eq!(number.get(), 1);
        assert_eq!(text.get(), "nope");
    }

    #[test]
    fn projection_is_a_property() {
        let flag = Observable::new(false);
        let inverted = map_reversible(&flag, |b| !b, |b: &bool| Some(!b));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = inverted.listen_now(move |v| s.borrow_mut().push(*v));
        flag.set(true);
        assert_eq!(*seen.borrow(), vec![true, false]);
    }
}
