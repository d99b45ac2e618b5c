#![forbid(unsafe_code)]

//! View generators: deferred constructors for navigation destinations.
//!
//! A navigation stack holds generators rather than views, so a screen is
//! only built when it becomes visible. Handles compare by identity: two
//! handles are equal only when they point at the same generator instance.
//!
//! Swappers own what a generator builds and release it once it leaves, so
//! `generate` must return a fresh view on every call.

use std::fmt;
use std::rc::Rc;

use bindery_core::tree::ViewTree;

use crate::transition::StackTransition;

/// Builds the view for one navigation destination.
pub trait ViewGenerator<V: ViewTree> {
    /// Human-readable title (window title, breadcrumb, ...).
    fn title(&self) -> String {
        String::new()
    }

    /// Build the view.
    fn generate(&self, tree: &V) -> V::Node;

    /// Transitions to use instead of the stack's defaults when this
    /// generator is pushed (incoming) or popped (outgoing).
    fn custom_transition(&self) -> Option<StackTransition> {
        None
    }
}

/// Shared, identity-compared handle to a [`ViewGenerator`].
pub struct GeneratorHandle<V: ViewTree> {
    inner: Rc<dyn ViewGenerator<V>>,
}

impl<V: ViewTree> GeneratorHandle<V> {
    pub fn new(generator: impl ViewGenerator<V> + 'static) -> Self {
        Self {
            inner: Rc::new(generator),
        }
    }

    /// A generator built from a title and a closure.
    pub fn from_fn(title: impl Into<String>, build: impl Fn(&V) -> V::Node + 'static) -> Self {
        Self::new(FnGenerator {
            title: title.into(),
            build: Box::new(build),
            transition: None,
        })
    }

    /// Like [`from_fn`](Self::from_fn), with a custom transition.
    pub fn from_fn_with_transition(
        title: impl Into<String>,
        transition: StackTransition,
        build: impl Fn(&V) -> V::Node + 'static,
    ) -> Self {
        Self::new(FnGenerator {
            title: title.into(),
            build: Box::new(build),
            transition: Some(transition),
        })
    }

    #[must_use]
    pub fn title(&self) -> String {
        self.inner.title()
    }

    pub fn generate(&self, tree: &V) -> V::Node {
        self.inner.generate(tree)
    }

    #[must_use]
    pub fn custom_transition(&self) -> Option<StackTransition> {
        self.inner.custom_transition()
    }
}

impl<V: ViewTree> Clone for GeneratorHandle<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V: ViewTree> PartialEq for GeneratorHandle<V> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<V: ViewTree> Eq for GeneratorHandle<V> {}

impl<V: ViewTree> fmt::Debug for GeneratorHandle<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GeneratorHandle")
            .field(&self.inner.title())
            .finish()
    }
}

struct FnGenerator<V: ViewTree> {
    title: String,
    build: Box<dyn Fn(&V) -> V::Node>,
    transition: Option<StackTransition>,
}

impl<V: ViewTree> ViewGenerator<V> for FnGenerator<V> {
    fn title(&self) -> String {
        self.title.clone()
    }

    fn generate(&self, tree: &V) -> V::Node {
        (self.build)(tree)
    }

    fn custom_transition(&self) -> Option<StackTransition> {
        self.transition.clone()
    }
}

/// Generator producing an empty `div`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyView;

impl<V: ViewTree> ViewGenerator<V> for EmptyView {
    fn generate(&self, tree: &V) -> V::Node {
        tree.create_element("div")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_core::memory::MemoryTree;

    #[test]
    fn handles_compare_by_identity() {
        let a: GeneratorHandle<MemoryTree> = GeneratorHandle::new(EmptyView);
        let b: GeneratorHandle<MemoryTree> = GeneratorHandle::new(EmptyView);
        assert_eq!(a, a.clone());
        assert_ne!(a, b, "equal contents, different instances");
    }

    #[test]
    fn from_fn_generates_fresh_views() {
        let tree = MemoryTree::new();
        let page = GeneratorHandle::from_fn("Settings", |t: &MemoryTree| t.create_element("form"));
        let first = page.generate(&tree);
        let second = page.generate(&tree);
        assert_ne!(first, second);
        assert_eq!(tree.tag(first).unwrap(), "form");
        assert_eq!(page.title(), "Settings");
        assert!(page.custom_transition().is_none());
        assert_eq!(format!("{page:?}"), "GeneratorHandle(\"Settings\")");
    }

    #[test]
    fn custom_transition_is_exposed() {
        let modal = GeneratorHandle::<MemoryTree>::from_fn_with_transition(
            "Dialog",
            StackTransition::MODAL,
            |t| t.create_element("dialog"),
        );
        assert_eq!(modal.custom_transition(), Some(StackTransition::MODAL));
    }
}
