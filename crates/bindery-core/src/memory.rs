#![forbid(unsafe_code)]

//! In-memory [`ViewTree`] host.
//!
//! `MemoryTree` is an arena of nodes with DOM-like semantics: ordered
//! children, string properties, classes, inline styles, a hidden flag, and
//! named event listeners. Every structural or attribute change is appended
//! to a journal so tests can count exactly what a component did.
//!
//! Detaching a node through `remove_child` drains the node's subtree in the
//! tree's [`DisposalRegistry`], standing in for a DOM mutation observer.
//! Detached nodes stay in the arena until [`ViewTree::release`] frees them.
//!
//! # Invariants
//!
//! 1. A node has at most one parent; appending an attached node moves it
//!    without draining it.
//! 2. No arena borrow is held while listeners or disposal actions run.
//! 3. Operations on unknown nodes are ignored and logged at `warn`.
//! 4. `release` frees only parentless nodes, and frees their whole subtree.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::dispose::DisposalRegistry;
use crate::error::{BinderyError, Result};
use crate::tree::{EventData, Listener, ListenerId, PropValue, ViewTree};

/// Node handle of a [`MemoryTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A recorded tree mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Append { parent: NodeId, child: NodeId },
    InsertBefore { parent: NodeId, child: NodeId, reference: NodeId },
    Remove { parent: NodeId, child: NodeId },
    SetProperty { node: NodeId, name: String, value: PropValue },
    AddClass { node: NodeId, class: String },
    RemoveClass { node: NodeId, class: String },
    SetStyle { node: NodeId, name: String, value: String },
    RemoveStyle { node: NodeId, name: String },
    SetHidden { node: NodeId, hidden: bool },
    AddListener { node: NodeId, event: String },
    RemoveListener { node: NodeId, event: String },
}

impl Mutation {
    /// Whether this mutation changes the child structure.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Append { .. } | Self::InsertBefore { .. } | Self::Remove { .. }
        )
    }
}

struct NodeData {
    tag: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    props: BTreeMap<String, PropValue>,
    classes: Vec<String>,
    styles: BTreeMap<String, String>,
    hidden: bool,
    listeners: Vec<(ListenerId, String, Listener)>,
}

impl NodeData {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_owned(),
            parent: None,
            children: Vec::new(),
            props: BTreeMap::new(),
            classes: Vec::new(),
            styles: BTreeMap::new(),
            hidden: false,
            listeners: Vec::new(),
        }
    }
}

#[derive(Default)]
struct Arena {
    nodes: AHashMap<NodeId, NodeData>,
    next_node: u64,
    next_listener: u64,
    journal: Vec<Mutation>,
}

impl Arena {
    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        let found = self.nodes.get_mut(&id);
        if found.is_none() {
            tracing::warn!(message = "memory_tree.unknown_node", node = %id);
        }
        found
    }

    fn detach_from_parent(&mut self, child: NodeId) {
        let Some(parent) = self.nodes.get(&child).and_then(|n| n.parent) else {
            return;
        };
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.retain(|c| *c != child);
        }
        if let Some(c) = self.nodes.get_mut(&child) {
            c.parent = None;
        }
    }
}

/// Shared handle to an in-memory node arena.
#[derive(Clone)]
pub struct MemoryTree {
    arena: Rc<RefCell<Arena>>,
    registry: DisposalRegistry<NodeId>,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTree {
    #[must_use]
    pub fn new() -> Self {
        Self {
            arena: Rc::new(RefCell::new(Arena::default())),
            registry: DisposalRegistry::new(),
        }
    }

    /// Whether `node` exists in this arena.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.arena.borrow().nodes.contains_key(&node)
    }

    /// Number of live nodes in this arena, attached or not.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.arena.borrow().nodes.len()
    }

    /// Tag name of `node`.
    pub fn tag(&self, node: NodeId) -> Result<String> {
        self.arena
            .borrow()
            .nodes
            .get(&node)
            .map(|n| n.tag.clone())
            .ok_or_else(|| BinderyError::UnknownNode {
                node: node.to_string(),
            })
    }

    /// Fire `event` on `node`. Returns the number of listeners invoked.
    pub fn dispatch(&self, node: NodeId, event: &EventData) -> usize {
        let listeners: Vec<Listener> = {
            let arena = self.arena.borrow();
            let Some(data) = arena.nodes.get(&node) else {
                return 0;
            };
            data.listeners
                .iter()
                .filter(|(_, name, _)| *name == event.name)
                .map(|(_, _, l)| Rc::clone(l))
                .collect()
        };
        for listener in &listeners {
            listener(event);
        }
        listeners.len()
    }

    /// Number of listeners registered on `node` for `event`.
    #[must_use]
    pub fn listener_count(&self, node: NodeId, event: &str) -> usize {
        self.arena
            .borrow()
            .nodes
            .get(&node)
            .map_or(0, |n| n.listeners.iter().filter(|(_, e, _)| e == event).count())
    }

    /// Text of property `name` on each child of `parent`, in order.
    #[must_use]
    pub fn children_text(&self, parent: NodeId, name: &str) -> Vec<String> {
        let arena = self.arena.borrow();
        let Some(data) = arena.nodes.get(&parent) else {
            return Vec::new();
        };
        data.children
            .iter()
            .map(|c| {
                arena
                    .nodes
                    .get(c)
                    .and_then(|n| n.props.get(name))
                    .map(PropValue::to_text)
                    .unwrap_or_default()
            })
            .collect()
    }

    /// Drain the mutation journal.
    pub fn take_journal(&self) -> Vec<Mutation> {
        std::mem::take(&mut self.arena.borrow_mut().journal)
    }

    #[must_use]
    pub fn journal_len(&self) -> usize {
        self.arena.borrow().journal.len()
    }

    fn record(&self, mutation: Mutation) {
        self.arena.borrow_mut().journal.push(mutation);
    }
}

impl ViewTree for MemoryTree {
    type Node = NodeId;

    fn create_element(&self, tag: &str) -> NodeId {
        let mut arena = self.arena.borrow_mut();
        arena.next_node += 1;
        let id = NodeId(arena.next_node);
        arena.nodes.insert(id, NodeData::new(tag));
        id
    }

    fn append_child(&self, parent: &NodeId, child: &NodeId) {
        {
            let mut arena = self.arena.borrow_mut();
            if !arena.nodes.contains_key(child) || arena.node_mut(*parent).is_none() {
                return;
            }
            arena.detach_from_parent(*child);
            if let Some(p) = arena.nodes.get_mut(parent) {
                p.children.push(*child);
            }
            if let Some(c) = arena.nodes.get_mut(child) {
                c.parent = Some(*parent);
            }
        }
        self.record(Mutation::Append {
            parent: *parent,
            child: *child,
        });
    }

    fn insert_before(&self, parent: &NodeId, child: &NodeId, reference: &NodeId) {
        {
            let mut arena = self.arena.borrow_mut();
            if !arena.nodes.contains_key(child) || arena.node_mut(*parent).is_none() {
                return;
            }
            arena.detach_from_parent(*child);
            if let Some(p) = arena.nodes.get_mut(parent) {
                match p.children.iter().position(|c| c == reference) {
                    Some(index) => p.children.insert(index, *child),
                    None => p.children.push(*child),
                }
            }
            if let Some(c) = arena.nodes.get_mut(child) {
                c.parent = Some(*parent);
            }
        }
        self.record(Mutation::InsertBefore {
            parent: *parent,
            child: *child,
            reference: *reference,
        });
    }

    fn remove_child(&self, parent: &NodeId, child: &NodeId) -> bool {
        {
            let mut arena = self.arena.borrow_mut();
            let is_child = arena
                .nodes
                .get(child)
                .is_some_and(|c| c.parent == Some(*parent));
            if !is_child {
                return false;
            }
            arena.detach_from_parent(*child);
            arena.journal.push(Mutation::Remove {
                parent: *parent,
                child: *child,
            });
        }
        self.detach(child);
        true
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.arena
            .borrow()
            .nodes
            .get(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.arena.borrow().nodes.get(node).and_then(|n| n.parent)
    }

    fn set_property(&self, node: &NodeId, name: &str, value: PropValue) {
        {
            let mut arena = self.arena.borrow_mut();
            let Some(data) = arena.node_mut(*node) else {
                return;
            };
            data.props.insert(name.to_owned(), value.clone());
        }
        self.record(Mutation::SetProperty {
            node: *node,
            name: name.to_owned(),
            value,
        });
    }

    fn property(&self, node: &NodeId, name: &str) -> Option<PropValue> {
        self.arena
            .borrow()
            .nodes
            .get(node)
            .and_then(|n| n.props.get(name).cloned())
    }

    fn add_class(&self, node: &NodeId, class: &str) {
        {
            let mut arena = self.arena.borrow_mut();
            let Some(data) = arena.node_mut(*node) else {
                return;
            };
            if data.classes.iter().any(|c| c == class) {
                return;
            }
            data.classes.push(class.to_owned());
        }
        self.record(Mutation::AddClass {
            node: *node,
            class: class.to_owned(),
        });
    }

    fn remove_class(&self, node: &NodeId, class: &str) {
        {
            let mut arena = self.arena.borrow_mut();
            let Some(data) = arena.node_mut(*node) else {
                return;
            };
            let before = data.classes.len();
            data.classes.retain(|c| c != class);
            if data.classes.len() == before {
                return;
            }
        }
        self.record(Mutation::RemoveClass {
            node: *node,
            class: class.to_owned(),
        });
    }

    fn has_class(&self, node: &NodeId, class: &str) -> bool {
        self.arena
            .borrow()
            .nodes
            .get(node)
            .is_some_and(|n| n.classes.iter().any(|c| c == class))
    }

    fn set_style(&self, node: &NodeId, name: &str, value: &str) {
        {
            let mut arena = self.arena.borrow_mut();
            let Some(data) = arena.node_mut(*node) else {
                return;
            };
            data.styles.insert(name.to_owned(), value.to_owned());
        }
        self.record(Mutation::SetStyle {
            node: *node,
            name: name.to_owned(),
            value: value.to_owned(),
        });
    }

    fn remove_style(&self, node: &NodeId, name: &str) {
        {
            let mut arena = self.arena.borrow_mut();
            let Some(data) = arena.node_mut(*node) else {
                return;
            };
            if data.styles.remove(name).is_none() {
                return;
            }
        }
        self.record(Mutation::RemoveStyle {
            node: *node,
            name: name.to_owned(),
        });
    }

    fn style(&self, node: &NodeId, name: &str) -> Option<String> {
        self.arena
            .borrow()
            .nodes
            .get(node)
            .and_then(|n| n.styles.get(name).cloned())
    }

    fn set_hidden(&self, node: &NodeId, hidden: bool) {
        {
            let mut arena = self.arena.borrow_mut();
            let Some(data) = arena.node_mut(*node) else {
                return;
            };
            data.hidden = hidden;
        }
        self.record(Mutation::SetHidden {
            node: *node,
            hidden,
        });
    }

    fn is_hidden(&self, node: &NodeId) -> bool {
        self.arena.borrow().nodes.get(node).is_some_and(|n| n.hidden)
    }

    fn add_listener(&self, node: &NodeId, event: &str, listener: Listener) -> ListenerId {
        let id = {
            let mut arena = self.arena.borrow_mut();
            arena.next_listener += 1;
            let id = ListenerId(arena.next_listener);
            let Some(data) = arena.node_mut(*node) else {
                return id;
            };
            data.listeners.push((id, event.to_owned(), listener));
            id
        };
        self.record(Mutation::AddListener {
            node: *node,
            event: event.to_owned(),
        });
        id
    }

    fn remove_listener(&self, node: &NodeId, id: ListenerId) -> bool {
        let event = {
            let mut arena = self.arena.borrow_mut();
            let Some(data) = arena.nodes.get_mut(node) else {
                return false;
            };
            let Some(index) = data.listeners.iter().position(|(l, _, _)| *l == id) else {
                return false;
            };
            // Dropped after the borrow ends; the closure may own tree handles.
            data.listeners.remove(index)
        };
        self.record(Mutation::RemoveListener {
            node: *node,
            event: event.1.clone(),
        });
        drop(event);
        true
    }

    fn release(&self, node: &NodeId) {
        if self.parent(node).is_some() {
            tracing::warn!(message = "memory_tree.release_attached", node = %node);
            return;
        }
        self.detach(node);
        let freed: Vec<NodeData> = {
            let mut arena = self.arena.borrow_mut();
            let mut freed = Vec::new();
            let mut pending = vec![*node];
            while let Some(id) = pending.pop() {
                if let Some(data) = arena.nodes.remove(&id) {
                    pending.extend(data.children.iter().copied());
                    freed.push(data);
                }
            }
            freed
        };
        tracing::trace!(message = "memory_tree.release", node = %node, freed = freed.len());
        // Listener closures may own tree handles; drop them unborrowed.
        drop(freed);
    }

    fn registry(&self) -> &DisposalRegistry<NodeId> {
        &self.registry
    }
}

impl fmt::Debug for MemoryTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arena = self.arena.borrow();
        f.debug_struct("MemoryTree")
            .field("nodes", &arena.nodes.len())
            .field("journal", &arena.journal.len())
            .finish()
    }
}
