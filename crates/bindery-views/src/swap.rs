#![forbid(unsafe_code)]

//! Animated replacement of the single view shown in a container.
//!
//! [`swap_views`] moves a container from showing `previous` to showing
//! `next`. The outgoing view plays its exit animation and is removed when
//! the animation ends; the incoming view is appended right away and plays
//! its enter animation. Both run concurrently.
//!
//! Every animation arms two completions: an `animationend` listener on the
//! animated node and a fallback timer (`animation + grace`). Whichever fires
//! first completes the animation and disarms the other, so a host that never
//! reports animation events still converges.
//!
//! # Invariants
//!
//! 1. Swapping a view for itself touches nothing and schedules nothing.
//! 2. A node has at most one pending animation; starting a new one (or
//!    re-inserting a node that is still leaving) cancels the old one.
//! 3. An outgoing view is removed only if it is still a child of the
//!    container when its exit completes.
//! 4. A container left without a view is hidden.
//! 5. An owning [`SlotSwapper`] releases each outgoing view to the tree once
//!    it has been removed; [`swap_views`] never releases.
//!
//! # Failure Modes
//!
//! - Host never fires `animationend`: the fallback timer completes the
//!   animation and logs `swap.fallback` at debug level.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use bindery_core::config::SwapConfig;
use bindery_core::timer::{Scheduler, TimerId};
use bindery_core::tree::{ANIMATION_END, EventData, ListenerId, ViewTree};

use crate::transition::Transition;

const ANIMATION_STYLE: &str = "animation";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Enter,
    Exit { release: bool },
}

struct PendingAnimation {
    token: u64,
    listener: ListenerId,
    timer: TimerId,
}

/// Everything a swap needs from its environment.
///
/// Cloning shares the pending-animation table.
pub struct SwapContext<V: ViewTree> {
    tree: V,
    scheduler: Rc<dyn Scheduler>,
    config: SwapConfig,
    pending: Rc<RefCell<AHashMap<V::Node, PendingAnimation>>>,
    next_token: Rc<Cell<u64>>,
}

impl<V: ViewTree> Clone for SwapContext<V> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
            scheduler: Rc::clone(&self.scheduler),
            config: self.config,
            pending: Rc::clone(&self.pending),
            next_token: Rc::clone(&self.next_token),
        }
    }
}

impl<V: ViewTree> fmt::Debug for SwapContext<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwapContext")
            .field("config", &self.config)
            .field("pending", &self.pending.borrow().len())
            .finish()
    }
}

impl<V: ViewTree> SwapContext<V> {
    pub fn new(tree: &V, scheduler: Rc<dyn Scheduler>) -> Self {
        Self::with_config(tree, scheduler, SwapConfig::default())
    }

    pub fn with_config(tree: &V, scheduler: Rc<dyn Scheduler>, config: SwapConfig) -> Self {
        Self {
            tree: tree.clone(),
            scheduler,
            config,
            pending: Rc::new(RefCell::new(AHashMap::new())),
            next_token: Rc::new(Cell::new(0)),
        }
    }

    #[must_use]
    pub fn tree(&self) -> &V {
        &self.tree
    }

    #[must_use]
    pub fn scheduler(&self) -> &Rc<dyn Scheduler> {
        &self.scheduler
    }

    #[must_use]
    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    /// Number of animations still waiting for completion.
    #[must_use]
    pub fn pending_animations(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Whether `node` has an animation in flight.
    #[must_use]
    pub fn is_animating(&self, node: &V::Node) -> bool {
        self.pending.borrow().contains_key(node)
    }

    // ---- Animation bookkeeping ----

    fn start(&self, container: &V::Node, node: &V::Node, name: &str, phase: Phase) {
        self.cancel(node);

        let token = self.next_token.get() + 1;
        self.next_token.set(token);
        self.tree
            .set_style(node, ANIMATION_STYLE, &self.config.animation_style(name));

        let listener = {
            let ctx = self.clone();
            let (owner, target, name) = (container.clone(), node.clone(), name.to_owned());
            self.tree.add_listener(
                node,
                ANIMATION_END,
                Rc::new(move |event: &EventData| {
                    if event.animation.as_deref().is_some_and(|a| a != name) {
                        return;
                    }
                    ctx.complete(&owner, &target, token, phase);
                }),
            )
        };
        let timer = {
            let ctx = self.clone();
            let (owner, target) = (container.clone(), node.clone());
            self.scheduler.schedule(
                self.config.fallback(),
                Box::new(move || {
                    tracing::debug!(message = "swap.fallback", node = ?target, phase = ?phase);
                    ctx.complete(&owner, &target, token, phase);
                }),
            )
        };

        self.pending.borrow_mut().insert(
            node.clone(),
            PendingAnimation {
                token,
                listener,
                timer,
            },
        );
    }

    /// Finish the animation identified by `token`, if it is still current.
    fn complete(&self, container: &V::Node, node: &V::Node, token: u64, phase: Phase) {
        let current = self
            .pending
            .borrow()
            .get(node)
            .is_some_and(|entry| entry.token == token);
        if !current {
            return;
        }
        let Some(entry) = self.pending.borrow_mut().remove(node) else {
            return;
        };
        self.disarm(node, &entry);

        match phase {
            Phase::Enter => self.tree.remove_style(node, ANIMATION_STYLE),
            Phase::Exit { release } => self.finish_exit(container, node, release),
        }
    }

    fn finish_exit(&self, container: &V::Node, node: &V::Node, release: bool) {
        if self.tree.parent(node).as_ref() == Some(container) {
            self.tree.remove_child(container, node);
        }
        if release && self.tree.parent(node).is_none() {
            self.tree.release(node);
        }
    }

    /// Drop any animation pending on `node` without completing it.
    fn cancel(&self, node: &V::Node) -> bool {
        let entry = self.pending.borrow_mut().remove(node);
        match entry {
            Some(entry) => {
                self.disarm(node, &entry);
                self.tree.remove_style(node, ANIMATION_STYLE);
                true
            }
            None => false,
        }
    }

    fn disarm(&self, node: &V::Node, entry: &PendingAnimation) {
        self.tree.remove_listener(node, entry.listener);
        self.scheduler.cancel(entry.timer);
    }
}

/// Move `container` from showing `previous` to showing `next`.
///
/// Returns `false` when nothing had to change.
pub fn swap_views<V: ViewTree>(
    ctx: &SwapContext<V>,
    container: &V::Node,
    previous: Option<&V::Node>,
    next: Option<&V::Node>,
    transition: &Transition,
) -> bool {
    swap(ctx, container, previous, next, transition, false)
}

fn swap<V: ViewTree>(
    ctx: &SwapContext<V>,
    container: &V::Node,
    previous: Option<&V::Node>,
    next: Option<&V::Node>,
    transition: &Transition,
    release: bool,
) -> bool {
    let tree = &ctx.tree;
    if previous == next {
        if next.is_none() && !tree.is_hidden(container) {
            tree.set_hidden(container, true);
        }
        return false;
    }

    let _span = tracing::debug_span!(
        "swap.views",
        from = ?previous,
        to = ?next,
        enter = ?transition.enter,
        exit = ?transition.exit,
    )
    .entered();

    if let Some(old) = previous {
        match transition.exit.as_deref() {
            Some(name) => ctx.start(container, old, name, Phase::Exit { release }),
            None => {
                ctx.cancel(old);
                ctx.finish_exit(container, old, release);
            }
        }
    }

    match next {
        Some(new) => {
            ctx.cancel(new);
            if ctx.config.fill_container {
                tree.set_style(new, "width", "100%");
                tree.set_style(new, "height", "100%");
            }
            if tree.is_hidden(container) {
                tree.set_hidden(container, false);
            }
            tree.append_child(container, new);
            if let Some(name) = transition.enter.as_deref() {
                ctx.start(container, new, name, Phase::Enter);
            }
        }
        None => {
            if !tree.is_hidden(container) {
                tree.set_hidden(container, true);
            }
        }
    }
    true
}

/// A container that shows one view at a time.
pub struct SlotSwapper<V: ViewTree> {
    ctx: SwapContext<V>,
    container: V::Node,
    current: RefCell<Option<V::Node>>,
    owning: bool,
}

impl<V: ViewTree> SlotSwapper<V> {
    /// A slot over views the caller keeps and may show again.
    pub fn new(ctx: &SwapContext<V>, container: &V::Node) -> Self {
        Self {
            ctx: ctx.clone(),
            container: container.clone(),
            current: RefCell::new(None),
            owning: false,
        }
    }

    /// A slot that owns the views it shows and releases each one after it
    /// leaves. A released view must not be shown again.
    pub fn owning(ctx: &SwapContext<V>, container: &V::Node) -> Self {
        Self {
            owning: true,
            ..Self::new(ctx, container)
        }
    }

    #[must_use]
    pub fn container(&self) -> &V::Node {
        &self.container
    }

    #[must_use]
    pub fn context(&self) -> &SwapContext<V> {
        &self.ctx
    }

    /// The view currently shown.
    #[must_use]
    pub fn current(&self) -> Option<V::Node> {
        self.current.borrow().clone()
    }

    /// Show `next`, animating with `transition`. Returns `false` when `next`
    /// is already shown.
    pub fn show(&self, next: Option<V::Node>, transition: &Transition) -> bool {
        let previous = self.current.replace(next.clone());
        swap(
            &self.ctx,
            &self.container,
            previous.as_ref(),
            next.as_ref(),
            transition,
            self.owning,
        )
    }
}

impl<V: ViewTree> fmt::Debug for SlotSwapper<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotSwapper")
            .field("container", &self.container)
            .field("current", &self.current.borrow())
            .field("owning", &self.owning)
            .finish()
    }
}
