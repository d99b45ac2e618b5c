#![forbid(unsafe_code)]

//! Show the top of a navigation stack in a container.
//!
//! [`show_in_swap`] watches a [`StackProperty`] of [`GeneratorHandle`]s.
//! Emissions are debounced; when the quiet period ends the swapper compares
//! the stack's top generator with the one on screen and, if it changed,
//! builds the new view and swaps it in with a transition chosen from the
//! direction of the change.
//!
//! # Transition selection
//!
//! | sizes (previous → new) | direction | source of the transition |
//! |------------------------|-----------|--------------------------|
//! | 0 → 0                  | neutral   | stack default |
//! | n → 0                  | pop       | outgoing override, else default |
//! | growing                | push      | incoming override, else default |
//! | shrinking              | pop       | outgoing override, else default |
//! | same, nonzero          | neutral   | incoming override, else default |
//!
//! # Invariants
//!
//! 1. Only the final state of a burst of emissions is shown.
//! 2. A generator that is already on screen is never rebuilt.
//! 3. The stack subscription and any pending debounce end when the
//!    container is detached.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use bindery_core::config::StackConfig;
use bindery_core::dispose::DisposeToken;
use bindery_core::timer::TimerId;
use bindery_core::tree::ViewTree;
use bindery_runtime::reactive::Property;
use bindery_runtime::stack::StackProperty;

use crate::generator::GeneratorHandle;
use crate::swap::{SlotSwapper, SwapContext};
use crate::transition::{Direction, StackTransition, Transition};

/// Pick the direction and transition for a stack change.
pub fn select_transition<V: ViewTree>(
    previous_size: usize,
    new_size: usize,
    outgoing: Option<&GeneratorHandle<V>>,
    incoming: Option<&GeneratorHandle<V>>,
    default: &StackTransition,
) -> (Direction, Transition) {
    let custom = |handle: Option<&GeneratorHandle<V>>| handle.and_then(GeneratorHandle::custom_transition);
    let (direction, chosen) = if new_size == 0 && previous_size == 0 {
        (Direction::Neutral, None)
    } else if new_size == 0 || new_size < previous_size {
        (Direction::Pop, custom(outgoing))
    } else if new_size > previous_size {
        (Direction::Push, custom(incoming))
    } else {
        (Direction::Neutral, custom(incoming))
    };
    let transition = chosen
        .as_ref()
        .unwrap_or(default)
        .for_direction(direction)
        .clone();
    (direction, transition)
}

struct StackSwapperInner<V: ViewTree> {
    slot: SlotSwapper<V>,
    stack: StackProperty<GeneratorHandle<V>>,
    default: StackTransition,
    debounce: Duration,
    shown: RefCell<Option<GeneratorHandle<V>>>,
    previous_size: Cell<usize>,
    pending: Cell<Option<TimerId>>,
    swaps: Cell<u64>,
}

impl<V: ViewTree> StackSwapperInner<V> {
    fn schedule(self: &Rc<Self>) {
        if self.debounce.is_zero() {
            self.apply();
            return;
        }
        let scheduler = self.slot.context().scheduler();
        if let Some(id) = self.pending.take() {
            scheduler.cancel(id);
        }
        let weak: Weak<Self> = Rc::downgrade(self);
        let id = scheduler.schedule(
            self.debounce,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.pending.set(None);
                    inner.apply();
                }
            }),
        );
        self.pending.set(Some(id));
    }

    fn apply(&self) {
        let items = self.stack.items();
        let new_size = items.len();
        let previous_size = self.previous_size.replace(new_size);
        let incoming = items.last().cloned();
        let outgoing = self.shown.borrow().clone();

        if incoming == outgoing {
            if incoming.is_none() {
                self.slot.show(None, &Transition::NONE);
            }
            return;
        }

        let (direction, transition) = select_transition(
            previous_size,
            new_size,
            outgoing.as_ref(),
            incoming.as_ref(),
            &self.default,
        );
        tracing::debug!(
            message = "stack.swap",
            from = ?outgoing,
            to = ?incoming,
            previous_size,
            new_size,
            direction = ?direction,
        );

        self.shown.replace(incoming.clone());
        let tree = self.slot.context().tree();
        let view = incoming.map(|generator| generator.generate(tree));
        self.slot.show(view, &transition);
        self.swaps.set(self.swaps.get() + 1);
    }

    fn cancel_pending(&self) {
        if let Some(id) = self.pending.take() {
            self.slot.context().scheduler().cancel(id);
        }
    }
}

/// Handle to a running stack-driven swapper.
///
/// The swapper stays alive as long as its container is attached; dropping
/// this handle does not stop it.
pub struct StackSwapper<V: ViewTree> {
    inner: Rc<StackSwapperInner<V>>,
}

impl<V: ViewTree> Clone for StackSwapper<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V: ViewTree> StackSwapper<V> {
    /// The generator currently on screen.
    #[must_use]
    pub fn current(&self) -> Option<GeneratorHandle<V>> {
        self.inner.shown.borrow().clone()
    }

    /// The view currently on screen.
    #[must_use]
    pub fn current_view(&self) -> Option<V::Node> {
        self.inner.slot.current()
    }

    /// Whether an emission is waiting out the debounce.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.pending.get().is_some()
    }

    /// Apply a pending emission now instead of waiting.
    pub fn flush(&self) {
        if self.inner.pending.get().is_some() {
            self.inner.cancel_pending();
            self.inner.apply();
        }
    }

    /// Number of swaps performed, including the initial one.
    #[must_use]
    pub fn swap_count(&self) -> u64 {
        self.inner.swaps.get()
    }
}

impl<V: ViewTree> fmt::Debug for StackSwapper<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackSwapper")
            .field("shown", &self.inner.shown.borrow())
            .field("previous_size", &self.inner.previous_size.get())
            .field("pending", &self.inner.pending.get().is_some())
            .finish()
    }
}

/// Show the top of `stack` in `container`, animating with `default` unless
/// a generator overrides it.
pub fn show_in_swap<V: ViewTree>(
    ctx: &SwapContext<V>,
    container: &V::Node,
    stack: &StackProperty<GeneratorHandle<V>>,
    default: StackTransition,
    config: StackConfig,
) -> StackSwapper<V> {
    let inner = Rc::new(StackSwapperInner {
        slot: SlotSwapper::owning(ctx, container),
        stack: stack.clone(),
        default,
        debounce: config.debounce(),
        shown: RefCell::new(None),
        previous_size: Cell::new(stack.len()),
        pending: Cell::new(None),
        swaps: Cell::new(0),
    });

    // Initial state: shown immediately, neutral transition.
    inner.apply();

    let weak = Rc::downgrade(&inner);
    let sub = stack.subscribe(move |_| {
        if let Some(inner) = weak.upgrade() {
            inner.schedule();
        }
    });

    let tree = ctx.tree();
    tree.on_removed(container, sub);
    let keep = Rc::clone(&inner);
    tree.on_removed(container, DisposeToken::new(move || keep.cancel_pending()));

    StackSwapper { inner }
}

/// Swap `container`'s content on every emission of a single generator
/// property, always with `transition`.
pub fn show_in_swap_property<V, P>(
    ctx: &SwapContext<V>,
    container: &V::Node,
    source: &P,
    transition: Transition,
) where
    V: ViewTree,
    P: Property<Option<GeneratorHandle<V>>>,
{
    let slot = SlotSwapper::owning(ctx, container);
    let shown: RefCell<Option<GeneratorHandle<V>>> = RefCell::new(None);
    let tree = ctx.tree().clone();
    let sub = source.listen_now(move |generator| {
        if *shown.borrow() == *generator {
            return;
        }
        shown.replace(generator.clone());
        let view = generator.as_ref().map(|g| g.generate(&tree));
        slot.show(view, &transition);
    });
    ctx.tree().on_removed(container, sub);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_core::memory::{MemoryTree, NodeId};
    use bindery_core::timer::{ManualScheduler, Scheduler};
    use bindery_runtime::reactive::Observable;

    fn page(tag: &'static str) -> GeneratorHandle<MemoryTree> {
        GeneratorHandle::from_fn(tag, move |t: &MemoryTree| t.create_element(tag))
    }

    fn modal_page(tag: &'static str) -> GeneratorHandle<MemoryTree> {
        GeneratorHandle::from_fn_with_transition(tag, StackTransition::MODAL, move |t: &MemoryTree| {
            t.create_element(tag)
        })
    }

    #[test]
    fn selection_table() {
        let plain = page("a");
        let modal = modal_page("m");
        let d = StackTransition::PUSH_POP;

        assert_eq!(
            select_transition::<MemoryTree>(0, 0, None, None, &d),
            (Direction::Neutral, Transition::FADE)
        );
        assert_eq!(
            select_transition(1, 2, Some(&plain), Some(&plain), &d),
            (Direction::Push, Transition::PUSH)
        );
        assert_eq!(
            select_transition(1, 2, Some(&plain), Some(&modal), &d),
            (Direction::Push, Transition::GROW_FADE),
            "incoming override on push"
        );
        assert_eq!(
            select_transition(2, 1, Some(&modal), Some(&plain), &d),
            (Direction::Pop, Transition::SHRINK_FADE),
            "outgoing override on pop"
        );
        assert_eq!(
            select_transition(2, 1, Some(&plain), Some(&modal), &d),
            (Direction::Pop, Transition::POP),
            "incoming override ignored on pop"
        );
        assert_eq!(
            select_transition::<MemoryTree>(1, 0, Some(&modal), None, &d),
            (Direction::Pop, Transition::SHRINK_FADE)
        );
        assert_eq!(
            select_transition(2, 2, Some(&plain), Some(&modal), &d),
            (Direction::Neutral, Transition::GROW_FADE)
        );
    }

    struct Nav {
        tree: MemoryTree,
        scheduler: Rc<ManualScheduler>,
        ctx: SwapContext<MemoryTree>,
        container: NodeId,
    }

    fn nav() -> Nav {
        let tree = MemoryTree::new();
        let scheduler = Rc::new(ManualScheduler::new());
        let ctx = SwapContext::new(&tree, scheduler.clone());
        let root = tree.create_element("body");
        let container = tree.create_element("main");
        tree.append_child(&root, &container);
        Nav {
            tree,
            scheduler,
            ctx,
            container,
        }
    }

    #[test]
    fn initial_stack_shown_immediately() {
        let n = nav();
        let stack = StackProperty::with_root(page("home"));
        let swapper = show_in_swap(&n.ctx, &n.container, &stack, StackTransition::PUSH_POP, StackConfig::default());
        let view = swapper.current_view().unwrap();
        assert_eq!(n.tree.tag(view).unwrap(), "home");
        assert_eq!(n.tree.style(&view, "animation").as_deref(), Some("fade-in 0.25s"));
        assert_eq!(swapper.swap_count(), 1);
    }

    #[test]
    fn push_uses_push_transition_after_debounce() {
        let n = nav();
        let stack = StackProperty::with_root(page("home"));
        let swapper = show_in_swap(&n.ctx, &n.container, &stack, StackTransition::PUSH_POP, StackConfig::default());
        n.scheduler.run_all();

        stack.push(page("detail"));
        assert!(swapper.is_pending());
        assert_eq!(n.tree.children(&n.container).len(), 1, "nothing before the debounce");

        n.scheduler.advance(Duration::from_millis(16));
        let view = swapper.current_view().unwrap();
        assert_eq!(n.tree.tag(view).unwrap(), "detail");
        assert_eq!(n.tree.style(&view, "animation").as_deref(), Some("push-in 0.25s"));

        stack.pop();
        n.scheduler.advance(Duration::from_millis(16));
        let view = swapper.current_view().unwrap();
        assert_eq!(n.tree.tag(view).unwrap(), "home");
        assert_eq!(n.tree.style(&view, "animation").as_deref(), Some("pop-in 0.25s"));
    }

    #[test]
    fn burst_collapses_into_one_swap() {
        let n = nav();
        let stack = StackProperty::with_root(page("home"));
        let swapper = show_in_swap(&n.ctx, &n.container, &stack, StackTransition::PUSH_POP, StackConfig::default());
        n.scheduler.run_all();

        stack.push(page("a"));
        stack.push(page("b"));
        stack.push(page("c"));
        n.scheduler.run_all();

        assert_eq!(swapper.swap_count(), 2);
        assert_eq!(swapper.current().map(|g| g.title()).as_deref(), Some("c"));
        assert_eq!(n.tree.children(&n.container).len(), 1);
    }

    #[test]
    fn push_then_pop_within_debounce_changes_nothing() {
        let n = nav();
        let home = page("home");
        let stack = StackProperty::with_root(home.clone());
        let swapper = show_in_swap(&n.ctx, &n.container, &stack, StackTransition::PUSH_POP, StackConfig::default());
        n.scheduler.run_all();
        n.tree.take_journal();

        stack.push(page("a"));
        stack.pop();
        n.scheduler.run_all();
        assert_eq!(swapper.swap_count(), 1);
        assert_eq!(swapper.current(), Some(home));
        assert_eq!(n.tree.journal_len(), 0);
    }

    #[test]
    fn zero_debounce_applies_synchronously() {
        let n = nav();
        let stack = StackProperty::new();
        let swapper = show_in_swap(
            &n.ctx,
            &n.container,
            &stack,
            StackTransition::NONE,
            StackConfig { debounce_ms: 0 },
        );
        assert!(n.tree.is_hidden(&n.container), "empty stack hides the container");
        stack.push(page("a"));
        assert_eq!(swapper.swap_count(), 1);
        assert!(!n.tree.is_hidden(&n.container));
        stack.dismiss();
        assert!(n.tree.is_hidden(&n.container));
        assert!(n.tree.children(&n.container).is_empty());
    }

    #[test]
    fn flush_applies_pending_now() {
        let n = nav();
        let stack = StackProperty::with_root(page("home"));
        let swapper = show_in_swap(&n.ctx, &n.container, &stack, StackTransition::NONE, StackConfig::default());
        stack.push(page("next"));
        swapper.flush();
        assert!(!swapper.is_pending());
        assert_eq!(n.scheduler.pending(), 0);
        assert_eq!(swapper.current().map(|g| g.title()).as_deref(), Some("next"));
    }

    #[test]
    fn detaching_container_stops_swapper() {
        let n = nav();
        let stack = StackProperty::with_root(page("home"));
        let swapper = show_in_swap(&n.ctx, &n.container, &stack, StackTransition::NONE, StackConfig::default());
        stack.push(page("next"));
        let parent = n.tree.parent(&n.container).unwrap();
        n.tree.remove_child(&parent, &n.container);

        assert!(!swapper.is_pending());
        n.scheduler.run_all();
        assert_eq!(swapper.current().map(|g| g.title()).as_deref(), Some("home"));
        stack.push(page("ignored"));
        assert_eq!(n.scheduler.pending(), 0);
    }

    #[test]
    fn navigation_churn_releases_screens() {
        let n = nav();
        let stack = StackProperty::with_root(page("home"));
        show_in_swap(&n.ctx, &n.container, &stack, StackTransition::PUSH_POP, StackConfig::default());
        n.scheduler.run_all();
        let baseline = n.tree.node_count();

        for _ in 0..300 {
            stack.push(page("detail"));
            n.scheduler.run_all();
            stack.pop();
            n.scheduler.run_all();
        }
        assert_eq!(n.tree.node_count(), baseline);
        assert_eq!(n.tree.children(&n.container).len(), 1);
    }

    #[test]
    fn property_swap_generates_on_change() {
        let n = nav();
        let a = page("a");
        let current = Observable::new(Some(a.clone()));
        show_in_swap_property(&n.ctx, &n.container, &current, Transition::NONE);
        assert_eq!(n.tree.children(&n.container).len(), 1);

        current.set(Some(a));
        assert_eq!(n.tree.children(&n.container).len(), 1, "same generator, no rebuild");

        current.set(Some(page("b")));
        let children = n.tree.children(&n.container);
        assert_eq!(children.len(), 1);
        assert_eq!(n.tree.tag(children[0]).unwrap(), "b");

        current.set(None);
        assert!(n.tree.is_hidden(&n.container));
    }
}
