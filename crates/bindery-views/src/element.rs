#![forbid(unsafe_code)]

//! Declarative element construction.
//!
//! ```
//! # use bindery_core::memory::MemoryTree;
//! # use bindery_core::tree::ViewTree;
//! # use bindery_runtime::reactive::Observable;
//! # use bindery_runtime::bind::BindingTarget;
//! # use bindery_views::element::ElementBuilder;
//! let tree = MemoryTree::new();
//! let title = Observable::new(String::from("Inbox"));
//! let header = ElementBuilder::new(&tree, "h1")
//!     .class("title")
//!     .bind(BindingTarget::field("text"), &title)
//!     .build();
//! title.set("Archive".into());
//! assert_eq!(tree.property(&header, "text").map(|v| v.to_text()).as_deref(), Some("Archive"));
//! ```

use std::fmt;

use bindery_core::error::Result;
use bindery_core::tree::{EventData, PropValue, ViewTree};
use bindery_runtime::bind::{self, BindingTarget};
use bindery_runtime::reactive::{Observable, Property, ReadProperty};

use crate::list;

/// Builder for one element and its bindings.
///
/// Bindings made through the builder are registered on the element, so they
/// end when the element is detached.
#[must_use]
pub struct ElementBuilder<V: ViewTree> {
    tree: V,
    node: V::Node,
}

impl<V: ViewTree> ElementBuilder<V> {
    pub fn new(tree: &V, tag: &str) -> Self {
        Self {
            node: tree.create_element(tag),
            tree: tree.clone(),
        }
    }

    /// Wrap an existing node.
    pub fn from_node(tree: &V, node: V::Node) -> Self {
        Self {
            tree: tree.clone(),
            node,
        }
    }

    /// The node under construction.
    #[must_use]
    pub fn node(&self) -> &V::Node {
        &self.node
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.prop("id", id.into())
    }

    pub fn class(self, class: &str) -> Self {
        self.tree.add_class(&self.node, class);
        self
    }

    pub fn style(self, name: &str, value: &str) -> Self {
        self.tree.set_style(&self.node, name, value);
        self
    }

    pub fn prop(self, name: &str, value: impl Into<PropValue>) -> Self {
        self.tree.set_property(&self.node, name, value.into());
        self
    }

    /// Static text content.
    pub fn text(self, text: impl Into<String>) -> Self {
        self.prop("text", text.into())
    }

    pub fn child(self, child: &V::Node) -> Self {
        self.tree.append_child(&self.node, child);
        self
    }

    pub fn children<'a>(self, children: impl IntoIterator<Item = &'a V::Node>) -> Self
    where
        V::Node: 'a,
    {
        for child in children {
            self.tree.append_child(&self.node, child);
        }
        self
    }

    /// One-way binding of `source` into `target`.
    pub fn bind<T, P>(self, target: BindingTarget<V, T>, source: &P) -> Self
    where
        T: 'static,
        P: Property<T>,
    {
        bind::bind(&self.tree, &self.node, target, source);
        self
    }

    /// Two-way binding, read back on `event`.
    pub fn bind_mutable<T>(
        self,
        target: BindingTarget<V, T>,
        event: &str,
        value: &Observable<T>,
    ) -> Result<Self>
    where
        T: Clone + 'static,
    {
        bind::bind_mutable(&self.tree, &self.node, target, event, value)?;
        Ok(self)
    }

    /// Listen for `event` until the element is detached.
    pub fn on(self, event: &str, f: impl Fn(&EventData) + 'static) -> Self {
        bind::event_listener(&self.tree, &self.node, event, f);
        self
    }

    /// Render one child per element of `source`.
    pub fn show_in<T, P>(
        self,
        source: &P,
        factory: impl Fn(&V, ReadProperty<T>) -> V::Node + 'static,
    ) -> Self
    where
        T: Clone + 'static,
        P: Property<Vec<T>>,
    {
        list::show_in(&self.tree, &self.node, source, factory);
        self
    }

    pub fn build(self) -> V::Node {
        self.node
    }
}

impl<V: ViewTree> fmt::Debug for ElementBuilder<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementBuilder")
            .field("node", &self.node)
            .finish()
    }
}
