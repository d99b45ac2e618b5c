#![forbid(unsafe_code)]

//! Host view-tree abstraction.
//!
//! [`ViewTree`] is the only surface bindery mutates. A browser host maps it
//! onto the DOM, a retained-mode host onto its widget tree, and tests use
//! [`MemoryTree`](crate::memory::MemoryTree).
//!
//! Handles are cheap to clone and every method takes `&self`: callbacks fired
//! from inside one operation (listeners, detach drains) may call back into
//! the tree.
//!
//! # Detach contract
//!
//! When `remove_child` (or `replace_child`) detaches a node, the host must
//! drain the node's subtree in [`ViewTree::registry`], the way a DOM
//! mutation observer would. Hosts without such a hook call
//! [`ViewTree::detach`] explicitly after removing a node.
//!
//! Components that build nodes and later drop them for good call
//! [`ViewTree::release`] once the node is detached. Hosts whose nodes are
//! garbage collected can ignore it; arena hosts free the subtree.

use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use crate::dispose::{DisposalRegistry, Disposable};

/// A property value stored on a node.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl PropValue {
    /// Render the value as text (what a DOM attribute would hold).
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
        }
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for PropValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Conversion back from a stored property, used by two-way bindings.
pub trait FromPropValue: Sized {
    fn from_prop(value: &PropValue) -> Option<Self>;
}

impl FromPropValue for String {
    fn from_prop(value: &PropValue) -> Option<Self> {
        Some(value.to_text())
    }
}

impl FromPropValue for bool {
    fn from_prop(value: &PropValue) -> Option<Self> {
        match value {
            PropValue::Bool(b) => Some(*b),
            PropValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl FromPropValue for i64 {
    fn from_prop(value: &PropValue) -> Option<Self> {
        match value {
            PropValue::Int(i) => Some(*i),
            PropValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FromPropValue for i32 {
    fn from_prop(value: &PropValue) -> Option<Self> {
        i64::from_prop(value).and_then(|v| i32::try_from(v).ok())
    }
}

impl FromPropValue for u32 {
    fn from_prop(value: &PropValue) -> Option<Self> {
        i64::from_prop(value).and_then(|v| u32::try_from(v).ok())
    }
}

impl FromPropValue for f64 {
    fn from_prop(value: &PropValue) -> Option<Self> {
        match value {
            PropValue::Float(f) => Some(*f),
            PropValue::Int(i) => Some(*i as f64),
            PropValue::Text(s) => s.trim().parse().ok(),
            PropValue::Bool(_) => None,
        }
    }
}

/// An event delivered to node listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventData {
    /// Event name (`"input"`, `"click"`, `"animationend"`, ...).
    pub name: String,
    /// Animation name for `animationend` events.
    pub animation: Option<String>,
}

impl EventData {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            animation: None,
        }
    }

    #[must_use]
    pub fn animation_end(animation: impl Into<String>) -> Self {
        Self {
            name: ANIMATION_END.to_owned(),
            animation: Some(animation.into()),
        }
    }
}

/// Event name fired by hosts when a CSS-style animation finishes.
pub const ANIMATION_END: &str = "animationend";

/// Listener callback type.
pub type Listener = Rc<dyn Fn(&EventData)>;

/// Identifier of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Imperative tree-mutation surface used by every bindery component.
pub trait ViewTree: Clone + 'static {
    /// Node identity. Equality is reference identity.
    type Node: Clone + Eq + Hash + fmt::Debug + 'static;

    /// Create a detached element.
    fn create_element(&self, tag: &str) -> Self::Node;

    /// Append `child` as the last child of `parent`.
    fn append_child(&self, parent: &Self::Node, child: &Self::Node);

    /// Insert `child` before `reference` (append when `reference` is not a child).
    fn insert_before(&self, parent: &Self::Node, child: &Self::Node, reference: &Self::Node);

    /// Detach `child` from `parent`. Returns `false` if it was not a child.
    fn remove_child(&self, parent: &Self::Node, child: &Self::Node) -> bool;

    /// Put `new` where `old` is, then detach `old`.
    fn replace_child(&self, parent: &Self::Node, old: &Self::Node, new: &Self::Node) {
        self.insert_before(parent, new, old);
        self.remove_child(parent, old);
    }

    /// Current children of `node`, in order.
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    fn set_property(&self, node: &Self::Node, name: &str, value: PropValue);

    fn property(&self, node: &Self::Node, name: &str) -> Option<PropValue>;

    fn add_class(&self, node: &Self::Node, class: &str);

    fn remove_class(&self, node: &Self::Node, class: &str);

    fn has_class(&self, node: &Self::Node, class: &str) -> bool;

    fn set_style(&self, node: &Self::Node, name: &str, value: &str);

    fn remove_style(&self, node: &Self::Node, name: &str);

    fn style(&self, node: &Self::Node, name: &str) -> Option<String>;

    fn set_hidden(&self, node: &Self::Node, hidden: bool);

    fn is_hidden(&self, node: &Self::Node) -> bool;

    fn add_listener(&self, node: &Self::Node, event: &str, listener: Listener) -> ListenerId;

    fn remove_listener(&self, node: &Self::Node, id: ListenerId) -> bool;

    /// The registry drained when nodes of this tree are detached.
    fn registry(&self) -> &DisposalRegistry<Self::Node>;

    /// Drain `node` and its subtree. Returns the number of tokens disposed.
    fn detach(&self, node: &Self::Node) -> usize {
        self.registry().node_removed(node, |n| self.children(n))
    }

    /// Forget a detached `node` and its subtree. The caller never uses them
    /// again. Attached nodes are left alone.
    fn release(&self, node: &Self::Node) {
        let _ = node;
    }

    /// Tie `token` to the lifetime of `node`.
    fn on_removed(&self, node: &Self::Node, token: impl Disposable + 'static) {
        self.registry().register(node, token);
    }
}

/// Token removing a listener when disposed.
pub struct ListenerGuard<V: ViewTree> {
    tree: V,
    node: V::Node,
    id: Option<ListenerId>,
}

impl<V: ViewTree> ListenerGuard<V> {
    /// Register `listener` on `node` and return the guard owning it.
    pub fn attach(tree: &V, node: &V::Node, event: &str, listener: Listener) -> Self {
        let id = tree.add_listener(node, event, listener);
        Self {
            tree: tree.clone(),
            node: node.clone(),
            id: Some(id),
        }
    }

    /// The listener id, until the guard is disposed.
    #[must_use]
    pub fn id(&self) -> Option<ListenerId> {
        self.id
    }
}

impl<V: ViewTree> Disposable for ListenerGuard<V> {
    fn dispose(&mut self) {
        if let Some(id) = self.id.take() {
            self.tree.remove_listener(&self.node, id);
        }
    }

    fn is_disposed(&self) -> bool {
        self.id.is_none()
    }
}

impl<V: ViewTree> fmt::Debug for ListenerGuard<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerGuard")
            .field("node", &self.node)
            .field("id", &self.id)
            .finish()
    }
}
