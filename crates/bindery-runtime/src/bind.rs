#![forbid(unsafe_code)]

//! Bindings between properties and tree nodes.
//!
//! Every helper registers what it creates (subscriptions, listeners) on the
//! bound node's registry entry, so detaching the node tears the binding
//! down. A [`BindingTarget`] names what on the node is written:
//!
//! - [`BindingTarget::Field`]: a node property, converted through
//!   [`PropValue`].
//! - [`BindingTarget::Accessor`]: a [`VirtualProperty`] with custom read and
//!   write logic (`has_class`, `view_visible`, `view_exists`, ...).
//! - [`BindingTarget::Callback`]: a write-only closure.
//!
//! The target is resolved once, when the binding is built. Targets compose:
//! [`reverse`] runs values through an invertible function on the way in and
//! out, and [`chain`] applies a target to a node reached from the bound one.
//!
//! # Invariants
//!
//! 1. One-way bindings deliver the source's current value immediately.
//! 2. A two-way binding shares one suppression flag between the
//!    node-to-value and value-to-node directions; neither direction echoes,
//!    even when a node write synchronously fires the bound event.
//! 3. The suppression flag is lowered when a write unwinds.
//! 4. Source errors are never swallowed: they reach [`error::report`].
//! 5. A throttled listener runs at most once per window.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use bindery_core::dispose::DisposeToken;
use bindery_core::error::{self, BinderyError, Result};
use bindery_core::timer::{Scheduler, TimerId};
use bindery_core::tree::{EventData, FromPropValue, ListenerGuard, ListenerId, PropValue, ViewTree};

use crate::reactive::{Observable, Property, Suppressed};

/// Window used by hosts that do not pick their own throttle.
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

/// A computed property of a node with custom read/write logic.
pub trait VirtualProperty<V: ViewTree, T> {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Read the current value from the node.
    fn read(&self, tree: &V, node: &V::Node) -> Option<T>;

    /// Write `value` to the node.
    fn write(&self, tree: &V, node: &V::Node, value: &T);
}

/// A node property bound through [`PropValue`] conversions.
pub struct FieldTarget<T> {
    name: String,
    encode: fn(&T) -> PropValue,
    decode: fn(&PropValue) -> Option<T>,
}

impl<T> fmt::Debug for FieldTarget<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldTarget").field("name", &self.name).finish()
    }
}

type WriteFn<V, T> = Rc<dyn Fn(&V, &<V as ViewTree>::Node, &T)>;
type ReadFn<V, T> = Rc<dyn Fn(&V, &<V as ViewTree>::Node) -> Option<T>>;

/// What a binding writes on its node.
pub enum BindingTarget<V: ViewTree, T> {
    Field(FieldTarget<T>),
    Accessor(Rc<dyn VirtualProperty<V, T>>),
    Callback(WriteFn<V, T>),
}

impl<V: ViewTree, T> fmt::Debug for BindingTarget<V, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(field) => f.debug_tuple("Field").field(&field.name).finish(),
            Self::Accessor(accessor) => f.debug_tuple("Accessor").field(&accessor.name()).finish(),
            Self::Callback(_) => f.write_str("Callback"),
        }
    }
}

impl<V: ViewTree, T: Clone + Into<PropValue> + FromPropValue + 'static> BindingTarget<V, T> {
    /// Bind to node property `name`.
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(FieldTarget {
            name: name.into(),
            encode: |value| value.clone().into(),
            decode: T::from_prop,
        })
    }
}

impl<V: ViewTree, T: 'static> BindingTarget<V, T> {
    /// Write-only target calling `f` on each value.
    pub fn callback(f: impl Fn(&V, &V::Node, &T) + 'static) -> Self {
        Self::Callback(Rc::new(f))
    }

    /// Target backed by a pair of closures.
    pub fn accessor(
        name: impl Into<String>,
        read: impl Fn(&V, &V::Node) -> Option<T> + 'static,
        write: impl Fn(&V, &V::Node, &T) + 'static,
    ) -> Self {
        Self::Accessor(Rc::new(FnAccessor {
            name: name.into(),
            read: Box::new(read),
            write: Box::new(write),
        }))
    }

    fn into_parts(self) -> Parts<V, T> {
        match self {
            Self::Field(field) => {
                let FieldTarget { name, encode, decode } = field;
                let read_name = name.clone();
                Parts {
                    label: name.clone(),
                    write: Rc::new(move |tree: &V, node: &V::Node, value: &T| {
                        tree.set_property(node, &name, encode(value));
                    }),
                    read: Some(Rc::new(move |tree: &V, node: &V::Node| {
                        tree.property(node, &read_name).and_then(|p| decode(&p))
                    })),
                }
            }
            Self::Accessor(accessor) => {
                let writer = Rc::clone(&accessor);
                Parts {
                    label: accessor.name().to_owned(),
                    write: Rc::new(move |tree: &V, node: &V::Node, value: &T| {
                        writer.write(tree, node, value);
                    }),
                    read: Some(Rc::new(move |tree: &V, node: &V::Node| accessor.read(tree, node))),
                }
            }
            Self::Callback(write) => Parts {
                label: "callback".to_owned(),
                write,
                read: None,
            },
        }
    }

    fn from_parts(parts: Parts<V, T>) -> Self {
        let Parts { label, write, read } = parts;
        match read {
            Some(read) => Self::Accessor(Rc::new(FnAccessor {
                name: label,
                read: Box::new(move |tree: &V, node: &V::Node| read(tree, node)),
                write: Box::new(move |tree: &V, node: &V::Node, value: &T| write(tree, node, value)),
            })),
            None => Self::Callback(write),
        }
    }

    fn resolve(self, tree: &V, node: &V::Node) -> Resolved<T> {
        let Parts { label, write, read } = self.into_parts();
        let (wt, wn) = (tree.clone(), node.clone());
        let (rt, rn) = (tree.clone(), node.clone());
        Resolved {
            label,
            write: Box::new(move |value| write(&wt, &wn, value)),
            read: read.map(|read| Box::new(move || read(&rt, &rn)) as Box<dyn Fn() -> Option<T>>),
        }
    }
}

struct Parts<V: ViewTree, T> {
    label: String,
    write: WriteFn<V, T>,
    read: Option<ReadFn<V, T>>,
}

struct FnAccessor<V: ViewTree, T> {
    name: String,
    read: Box<dyn Fn(&V, &V::Node) -> Option<T>>,
    write: Box<dyn Fn(&V, &V::Node, &T)>,
}

impl<V: ViewTree, T> VirtualProperty<V, T> for FnAccessor<V, T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, tree: &V, node: &V::Node) -> Option<T> {
        (self.read)(tree, node)
    }

    fn write(&self, tree: &V, node: &V::Node, value: &T) {
        (self.write)(tree, node, value);
    }
}

struct Resolved<T> {
    label: String,
    write: Box<dyn Fn(&T)>,
    read: Option<Box<dyn Fn() -> Option<T>>>,
}

// ---- Presets ----

/// Whether the node carries class `class`.
pub fn has_class<V: ViewTree>(class: impl Into<String>) -> BindingTarget<V, bool> {
    let class: Rc<str> = Rc::from(class.into());
    let (rc, wc) = (Rc::clone(&class), class);
    BindingTarget::accessor(
        format!("class:{rc}"),
        move |tree: &V, node: &V::Node| Some(tree.has_class(node, &rc)),
        move |tree: &V, node: &V::Node, on: &bool| {
            if *on {
                tree.add_class(node, &wc);
            } else {
                tree.remove_class(node, &wc);
            }
        },
    )
}

/// CSS-style `visibility`: hidden nodes keep their layout slot.
pub fn view_visible<V: ViewTree>() -> BindingTarget<V, bool> {
    BindingTarget::accessor(
        "visible",
        |tree: &V, node: &V::Node| Some(tree.style(node, "visibility").as_deref() != Some("hidden")),
        |tree: &V, node: &V::Node, visible: &bool| {
            tree.set_style(node, "visibility", if *visible { "visible" } else { "hidden" });
        },
    )
}

/// Whether the node takes part in layout at all (hidden flag + `display`).
pub fn view_exists<V: ViewTree>() -> BindingTarget<V, bool> {
    BindingTarget::accessor(
        "exists",
        |tree: &V, node: &V::Node| Some(!tree.is_hidden(node)),
        |tree: &V, node: &V::Node, exists: &bool| {
            tree.set_hidden(node, !*exists);
            if *exists {
                tree.remove_style(node, "display");
            } else {
                tree.set_style(node, "display", "none");
            }
        },
    )
}

// ---- Composition ----

/// `target` seen through an invertible function.
///
/// Reads return `forward(stored)`; writes store `inverse(value)`. A
/// write-only target stays write-only.
///
/// ```
/// # use bindery_core::memory::MemoryTree;
/// # use bindery_core::tree::ViewTree;
/// # use bindery_runtime::bind::{bind, reverse, view_visible};
/// # use bindery_runtime::reactive::Observable;
/// let tree = MemoryTree::new();
/// let node = tree.create_element("div");
/// let hidden = Observable::new(true);
/// bind(&tree, &node, reverse(view_visible(), |v: &bool| !v, |h: &bool| !h), &hidden);
/// assert_eq!(tree.style(&node, "visibility").as_deref(), Some("hidden"));
/// ```
pub fn reverse<V, T>(
    target: BindingTarget<V, T>,
    forward: impl Fn(&T) -> T + 'static,
    inverse: impl Fn(&T) -> T + 'static,
) -> BindingTarget<V, T>
where
    V: ViewTree,
    T: 'static,
{
    let Parts { label, write, read } = target.into_parts();
    BindingTarget::from_parts(Parts {
        label: format!("reverse({label})"),
        write: Rc::new(move |tree: &V, node: &V::Node, value: &T| write(tree, node, &inverse(value))),
        read: read.map(|read| {
            Rc::new(move |tree: &V, node: &V::Node| read(tree, node).map(|v| forward(&v)))
                as ReadFn<V, T>
        }),
    })
}

/// `target` applied to the node `step` reaches from the bound node.
///
/// When `step` finds nothing, writes are dropped and reads yield `None`.
pub fn chain<V, T>(
    step: impl Fn(&V, &V::Node) -> Option<V::Node> + 'static,
    target: BindingTarget<V, T>,
) -> BindingTarget<V, T>
where
    V: ViewTree,
    T: 'static,
{
    let Parts { label, write, read } = target.into_parts();
    let step: Rc<dyn Fn(&V, &V::Node) -> Option<V::Node>> = Rc::new(step);
    let read_step = Rc::clone(&step);
    BindingTarget::from_parts(Parts {
        label: format!("chain({label})"),
        write: Rc::new(move |tree: &V, node: &V::Node, value: &T| {
            if let Some(inner) = step(tree, node) {
                write(tree, &inner, value);
            }
        }),
        read: read.map(|read| {
            Rc::new(move |tree: &V, node: &V::Node| {
                read_step(tree, node).and_then(|inner| read(tree, &inner))
            }) as ReadFn<V, T>
        }),
    })
}

// ---------------------------------------------------------------------------
// Binding operations
// ---------------------------------------------------------------------------

/// One-way binding: write every value of `source` to `target` on `node`.
pub fn bind<V, T, P>(tree: &V, node: &V::Node, target: BindingTarget<V, T>, source: &P)
where
    V: ViewTree,
    T: 'static,
    P: Property<T>,
{
    let resolved = target.resolve(tree, node);
    tracing::trace!(message = "bind.one_way", target = %resolved.label, node = ?node);
    let write = resolved.write;
    let sub = source.listen_now(move |value| write(value));
    tree.on_removed(node, sub);
}

/// Run `action` for every value of `source` while `node` is attached.
pub fn bind_action<V, T, P>(tree: &V, node: &V::Node, source: &P, action: impl Fn(&T) + 'static)
where
    V: ViewTree,
    T: 'static,
    P: Property<T>,
{
    let sub = source.listen_now(action);
    tree.on_removed(node, sub);
}

/// Two-way binding between `target` on `node` and `value`.
///
/// `value` writes the node immediately and on every change; each `event` on
/// the node reads the target back into `value`. Fails with
/// [`BinderyError::UnreadableTarget`] for write-only targets.
pub fn bind_mutable<V, T>(
    tree: &V,
    node: &V::Node,
    target: BindingTarget<V, T>,
    event: &str,
    value: &Observable<T>,
) -> Result<()>
where
    V: ViewTree,
    T: Clone + 'static,
{
    let Resolved { label, write, read } = target.resolve(tree, node);
    let Some(read) = read else {
        return Err(BinderyError::UnreadableTarget { target: label });
    };
    tracing::trace!(message = "bind.two_way", target = %label, event, node = ?node);

    let suppress = Rc::new(Cell::new(false));

    let to_node = {
        let suppress = Rc::clone(&suppress);
        value.subscribe_now(move |v| {
            let Some(_held) = Suppressed::raise(&suppress) else {
                return;
            };
            write(v);
        })
    };

    let from_node = {
        let suppress = Rc::clone(&suppress);
        let value = value.clone();
        ListenerGuard::attach(
            tree,
            node,
            event,
            Rc::new(move |_: &EventData| {
                let Some(_held) = Suppressed::raise(&suppress) else {
                    return;
                };
                if let Some(current) = read() {
                    value.set(current);
                }
            }),
        )
    };

    tree.on_removed(node, to_node);
    tree.on_removed(node, from_node);
    Ok(())
}

/// One-way binding from a fallible source.
///
/// `Ok` values are written; `Err` values are reported to the error hook as
/// [`BinderyError::SourceFailed`] and leave the node untouched.
pub fn bind_fallible<V, T, E, P>(
    tree: &V,
    node: &V::Node,
    target: BindingTarget<V, T>,
    source_name: &str,
    source: &P,
) where
    V: ViewTree,
    T: 'static,
    E: fmt::Display + 'static,
    P: Property<std::result::Result<T, E>>,
{
    let resolved = target.resolve(tree, node);
    let write = resolved.write;
    let source_name = source_name.to_owned();
    let sub = source.listen_now(move |result| match result {
        Ok(value) => write(value),
        Err(err) => error::report(&BinderyError::source_failed(&source_name, err.to_string())),
    });
    tree.on_removed(node, sub);
}

/// Listen for `event` on `node` until the node is detached.
pub fn event_listener<V: ViewTree>(
    tree: &V,
    node: &V::Node,
    event: &str,
    f: impl Fn(&EventData) + 'static,
) -> ListenerId {
    let guard = ListenerGuard::attach(tree, node, event, Rc::new(f));
    let id = guard.id().unwrap_or(ListenerId(0));
    tree.on_removed(node, guard);
    id
}

/// Like [`event_listener`], but `f` runs at most once per `window`.
///
/// The first event opens a window on `scheduler`; events inside it are
/// dropped. Detaching the node cancels an open window.
pub fn throttled_event_listener<V: ViewTree>(
    tree: &V,
    node: &V::Node,
    event: &str,
    scheduler: &Rc<dyn Scheduler>,
    window: Duration,
    f: impl Fn(&EventData) + 'static,
) -> ListenerId {
    let open = Rc::new(Cell::new(true));
    let timer: Rc<Cell<Option<TimerId>>> = Rc::new(Cell::new(None));

    let id = {
        let (open, timer) = (Rc::clone(&open), Rc::clone(&timer));
        let scheduler = Rc::clone(scheduler);
        event_listener(tree, node, event, move |ev| {
            if !open.replace(false) {
                tracing::trace!(message = "bind.throttled", event = %ev.name);
                return;
            }
            let (reopen, slot) = (Rc::clone(&open), Rc::clone(&timer));
            let id = scheduler.schedule(
                window,
                Box::new(move || {
                    slot.set(None);
                    reopen.set(true);
                }),
            );
            timer.set(Some(id));
            f(ev);
        })
    };

    let scheduler = Rc::clone(scheduler);
    tree.on_removed(
        node,
        DisposeToken::new(move || {
            if let Some(id) = timer.take() {
                scheduler.cancel(id);
            }
        }),
    );
    id
}

/// Throttled listener that hands `f` the value `source` holds when the
/// event fires.
pub fn throttled_event_listener_with<V, T, P>(
    tree: &V,
    node: &V::Node,
    event: &str,
    scheduler: &Rc<dyn Scheduler>,
    window: Duration,
    source: &P,
    f: impl Fn(&T) + 'static,
) -> ListenerId
where
    V: ViewTree,
    P: Property<T> + Clone,
{
    let source = source.clone();
    throttled_event_listener(tree, node, event, scheduler, window, move |_| f(&source.get()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use std::panic::{AssertUnwindSafe, catch_unwind};

    use bindery_core::memory::{MemoryTree, Mutation, NodeId};
    use bindery_core::timer::ManualScheduler;

    use crate::reactive::Constant;

    /// A `value` accessor whose writes fire `input` synchronously, the way
    /// some hosts report programmatic edits.
    fn echoing_value(writes: &Rc<Cell<u32>>) -> BindingTarget<MemoryTree, String> {
        let writes = Rc::clone(writes);
        BindingTarget::accessor(
            "echoing-value",
            |tree: &MemoryTree, node: &NodeId| {
                tree.property(node, "value").map(|v| v.to_text())
            },
            move |tree: &MemoryTree, node: &NodeId, value: &String| {
                writes.set(writes.get() + 1);
                tree.set_property(node, "value", PropValue::from(value.as_str()));
                tree.dispatch(*node, &EventData::new("input"));
            },
        )
    }

    fn attached(tree: &MemoryTree) -> (NodeId, NodeId) {
        let root = tree.create_element("div");
        let node = tree.create_element("input");
        tree.append_child(&root, &node);
        (root, node)
    }

    #[test]
    fn field_binding_writes_current_and_future_values() {
        let tree = MemoryTree::new();
        let (_, node) = attached(&tree);
        let name = Observable::new("ada".to_string());

        bind(&tree, &node, BindingTarget::field("value"), &name);
        assert_eq!(tree.property(&node, "value"), Some(PropValue::from("ada")));

        name.set("grace".into());
        assert_eq!(tree.property(&node, "value"), Some(PropValue::from("grace")));
    }

    #[test]
    fn binding_stops_after_detach() {
        let tree = MemoryTree::new();
        let (root, node) = attached(&tree);
        let count = Observable::new(1_i64);
        bind(&tree, &node, BindingTarget::field("count"), &count);
        assert_eq!(count.subscriber_count(), 1);

        tree.remove_child(&root, &node);
        assert_eq!(count.subscriber_count(), 0);
        count.set(2);
        assert_eq!(tree.property(&node, "count"), Some(PropValue::Int(1)));
    }

    #[test]
    fn callback_target_and_action() {
        let tree = MemoryTree::new();
        let (_, node) = attached(&tree);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        bind(
            &tree,
            &node,
            BindingTarget::callback(move |_: &MemoryTree, _: &NodeId, v: &u32| s.borrow_mut().push(*v)),
            &Constant(3_u32),
        );
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        bind_action(&tree, &node, &Constant(()), move |_| h.set(h.get() + 1));
        assert_eq!(*seen.borrow(), vec![3]);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn two_way_binding_round_trip_without_echo() {
        let tree = MemoryTree::new();
        let (_, node) = attached(&tree);
        let text = Observable::new("a".to_string());
        bind_mutable(&tree, &node, BindingTarget::field("value"), "input", &text).unwrap();

        let version = text.version();
        tree.set_property(&node, "value", PropValue::from("typed"));
        tree.dispatch(node, &EventData::new("input"));
        assert_eq!(text.get(), "typed");
        assert_eq!(text.version(), version + 1);

        tree.take_journal();
        text.set("program".into());
        assert_eq!(tree.property(&node, "value"), Some(PropValue::from("program")));
        assert_eq!(tree.take_journal().len(), 1, "one node write per change");
    }

    #[test]
    fn two_way_binding_survives_synchronous_echo_events() {
        let tree = MemoryTree::new();
        let (_, node) = attached(&tree);
        let writes = Rc::new(Cell::new(0));
        let text = Observable::new("a".to_string());
        bind_mutable(&tree, &node, echoing_value(&writes), "input", &text).unwrap();
        assert_eq!(writes.get(), 1, "initial value written once");
        assert_eq!(text.version(), 0, "echo of the initial write ignored");

        let version = text.version();
        text.set("program".into());
        assert_eq!(writes.get(), 2, "one node write per change");
        assert_eq!(text.version(), version + 1, "one observable write per change");
        assert_eq!(tree.property(&node, "value"), Some(PropValue::from("program")));

        tree.set_property(&node, "value", PropValue::from("typed"));
        tree.take_journal();
        tree.dispatch(node, &EventData::new("input"));
        assert_eq!(text.get(), "typed");
        assert_eq!(text.version(), version + 2);
        assert_eq!(writes.get(), 2, "event direction never writes the node back");
        let journal = tree.take_journal();
        assert!(
            !journal.iter().any(|m| matches!(m, Mutation::SetProperty { .. })),
            "{journal:?}"
        );
    }

    #[test]
    fn two_way_binding_recovers_from_panicking_write() {
        let tree = MemoryTree::new();
        let (_, node) = attached(&tree);
        let text = Observable::new("ok".to_string());
        let target = BindingTarget::accessor(
            "fragile",
            |tree: &MemoryTree, node: &NodeId| tree.property(node, "value").map(|v| v.to_text()),
            |tree: &MemoryTree, node: &NodeId, value: &String| {
                assert_ne!(value, "boom", "write rejected");
                tree.set_property(node, "value", PropValue::from(value.as_str()));
            },
        );
        bind_mutable(&tree, &node, target, "input", &text).unwrap();

        let result = catch_unwind(AssertUnwindSafe(|| text.set("boom".into())));
        assert!(result.is_err());

        text.set("again".into());
        assert_eq!(tree.property(&node, "value"), Some(PropValue::from("again")));
        tree.set_property(&node, "value", PropValue::from("typed"));
        tree.dispatch(node, &EventData::new("input"));
        assert_eq!(text.get(), "typed");
    }

    #[test]
    fn two_way_binding_rejects_callback_target() {
        let tree = MemoryTree::new();
        let (_, node) = attached(&tree);
        let value = Observable::new(0_i64);
        let err = bind_mutable(
            &tree,
            &node,
            BindingTarget::callback(|_: &MemoryTree, _: &NodeId, _: &i64| {}),
            "input",
            &value,
        )
        .unwrap_err();
        assert_eq!(
            err,
            BinderyError::UnreadableTarget {
                target: "callback".into()
            }
        );
        assert_eq!(value.subscriber_count(), 0, "nothing registered on failure");
    }

    #[test]
    fn two_way_listener_removed_on_detach() {
        let tree = MemoryTree::new();
        let (root, node) = attached(&tree);
        let checked = Observable::new(false);
        bind_mutable(&tree, &node, BindingTarget::field("checked"), "change", &checked).unwrap();
        assert_eq!(tree.listener_count(node, "change"), 1);
        tree.remove_child(&root, &node);
        assert_eq!(tree.listener_count(node, "change"), 0);
        assert_eq!(checked.subscriber_count(), 0);
    }

    #[test]
    fn class_visibility_and_existence_presets() {
        let tree = MemoryTree::new();
        let (_, node) = attached(&tree);
        let on = Observable::new(true);

        bind(&tree, &node, has_class("selected"), &on);
        bind(&tree, &node, view_visible(), &on);
        bind(&tree, &node, view_exists(), &on);
        assert!(tree.has_class(&node, "selected"));
        assert_eq!(tree.style(&node, "visibility").as_deref(), Some("visible"));
        assert!(!tree.is_hidden(&node));

        on.set(false);
        assert!(!tree.has_class(&node, "selected"));
        assert_eq!(tree.style(&node, "visibility").as_deref(), Some("hidden"));
        assert!(tree.is_hidden(&node));
        assert_eq!(tree.style(&node, "display").as_deref(), Some("none"));
    }

    #[test]
    fn class_toggle_reads_back() {
        let tree = MemoryTree::new();
        let (_, node) = attached(&tree);
        let selected = Observable::new(false);
        bind_mutable(&tree, &node, has_class("active"), "click", &selected).unwrap();
        tree.add_class(&node, "active");
        tree.dispatch(node, &EventData::new("click"));
        assert!(selected.get());
    }

    #[test]
    fn fallible_source_reports_errors() {
        let tree = MemoryTree::new();
        let (_, node) = attached(&tree);
        let reported = Rc::new(RefCell::new(Vec::new()));
        let r = Rc::clone(&reported);
        error::set_error_hook(move |e| r.borrow_mut().push(e.clone()));

        let source: Observable<std::result::Result<String, String>> = Observable::new(Ok("ok".into()));
        bind_fallible(&tree, &node, BindingTarget::field("label"), "status", &source);
        source.set(Err("offline".into()));
        error::clear_error_hook();

        assert_eq!(tree.property(&node, "label"), Some(PropValue::from("ok")));
        assert_eq!(
            *reported.borrow(),
            vec![BinderyError::source_failed("status", "offline")]
        );
    }

    #[test]
    fn reverse_inverts_reads_and_writes() {
        let tree = MemoryTree::new();
        let (_, node) = attached(&tree);
        let hidden = Observable::new(false);
        let target = reverse(view_visible(), |v: &bool| !v, |h: &bool| !h);
        assert_eq!(format!("{target:?}"), "Accessor(\"reverse(visible)\")");
        bind_mutable(&tree, &node, target, "toggle", &hidden).unwrap();
        assert_eq!(tree.style(&node, "visibility").as_deref(), Some("visible"));

        hidden.set(true);
        assert_eq!(tree.style(&node, "visibility").as_deref(), Some("hidden"));

        tree.set_style(&node, "visibility", "visible");
        tree.dispatch(node, &EventData::new("toggle"));
        assert!(!hidden.get());
    }

    #[test]
    fn reverse_of_callback_stays_write_only() {
        let tree = MemoryTree::new();
        let (_, node) = attached(&tree);
        let seen = Rc::new(Cell::new(0));
        let s = Rc::clone(&seen);
        let target = reverse(
            BindingTarget::callback(move |_: &MemoryTree, _: &NodeId, v: &i32| s.set(*v)),
            |v: &i32| v - 1,
            |v: &i32| v + 1,
        );
        assert!(matches!(target, BindingTarget::Callback(_)));
        bind(&tree, &node, target, &Constant(41));
        assert_eq!(seen.get(), 42);
    }

    #[test]
    fn chain_binds_through_to_a_related_node() {
        let tree = MemoryTree::new();
        let (_, row) = attached(&tree);
        let label = tree.create_element("span");
        tree.append_child(&row, &label);

        let first_child = |tree: &MemoryTree, node: &NodeId| tree.children(node).first().copied();
        let name = Observable::new("ada".to_string());
        bind_mutable(
            &tree,
            &row,
            chain(first_child, BindingTarget::field("text")),
            "edit",
            &name,
        )
        .unwrap();
        assert_eq!(tree.property(&label, "text"), Some(PropValue::from("ada")));
        assert_eq!(tree.property(&row, "text"), None);

        tree.set_property(&label, "text", PropValue::from("grace"));
        tree.dispatch(row, &EventData::new("edit"));
        assert_eq!(name.get(), "grace");

        tree.remove_child(&row, &label);
        name.set("lin".into());
        assert_eq!(tree.property(&label, "text"), Some(PropValue::from("grace")), "no target, no write");
    }

    #[test]
    fn throttled_listener_runs_once_per_window() {
        let tree = MemoryTree::new();
        let (root, node) = attached(&tree);
        let clock = Rc::new(ManualScheduler::new());
        let scheduler: Rc<dyn Scheduler> = clock.clone();
        let clicks = Rc::new(Cell::new(0));
        let c = Rc::clone(&clicks);
        throttled_event_listener(&tree, &node, "click", &scheduler, DEFAULT_THROTTLE, move |_| {
            c.set(c.get() + 1);
        });

        for _ in 0..3 {
            tree.dispatch(node, &EventData::new("click"));
        }
        assert_eq!(clicks.get(), 1);
        clock.advance(Duration::from_millis(499));
        tree.dispatch(node, &EventData::new("click"));
        assert_eq!(clicks.get(), 1);
        clock.advance(Duration::from_millis(1));
        tree.dispatch(node, &EventData::new("click"));
        assert_eq!(clicks.get(), 2);

        tree.remove_child(&root, &node);
        assert_eq!(clock.pending(), 0, "open window canceled on detach");
        tree.dispatch(node, &EventData::new("click"));
        assert_eq!(clicks.get(), 2);
    }

    #[test]
    fn throttled_listener_reads_source_at_event_time() {
        let tree = MemoryTree::new();
        let (_, node) = attached(&tree);
        let clock = Rc::new(ManualScheduler::new());
        let scheduler: Rc<dyn Scheduler> = clock.clone();
        let index = Observable::new(0_u32);
        let taken = Rc::new(RefCell::new(Vec::new()));
        let t = Rc::clone(&taken);
        throttled_event_listener_with(
            &tree,
            &node,
            "next",
            &scheduler,
            Duration::from_millis(100),
            &index,
            move |i: &u32| t.borrow_mut().push(*i),
        );

        index.set(3);
        tree.dispatch(node, &EventData::new("next"));
        index.set(4);
        tree.dispatch(node, &EventData::new("next"));
        clock.advance(Duration::from_millis(100));
        tree.dispatch(node, &EventData::new("next"));
        assert_eq!(*taken.borrow(), vec![3, 4]);
    }

    #[test]
    fn event_listener_lives_with_node() {
        let tree = MemoryTree::new();
        let (root, node) = attached(&tree);
        let clicks = Rc::new(Cell::new(0));
        let c = Rc::clone(&clicks);
        event_listener(&tree, &node, "click", move |_| c.set(c.get() + 1));
        tree.dispatch(node, &EventData::new("click"));
        tree.remove_child(&root, &node);
        tree.dispatch(node, &EventData::new("click"));
        assert_eq!(clicks.get(), 1);
    }
}
