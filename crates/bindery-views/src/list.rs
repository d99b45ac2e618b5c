#![forbid(unsafe_code)]

//! Index-keyed list reconciliation.
//!
//! [`ListReconciler`] keeps one child view per element of an array source.
//! Each child owns a value holder; the child's factory receives a read-only
//! view of that holder and binds to it, so an element that changes in place
//! is pushed into the existing view instead of rebuilding it.
//!
//! Identity is the array index. Reordering the source updates cells in place
//! and never moves nodes.
//!
//! # Invariants
//!
//! 1. After every pass, `cells.len() == source.len()` and cell `i` holds
//!    `source[i]`.
//! 2. Shrinking removes exactly the trailing surplus; retained views are
//!    never recreated.
//! 3. Growing appends exactly the missing cells and never reorders existing
//!    children.
//! 4. With a classifier, a retained index whose kind changed gets a fresh
//!    view in the same position.
//! 5. Every view a pass drops is released back to the tree.
//!
//! # Failure Modes
//!
//! - Factory panic: propagates. A cell is recorded only after its view was
//!   appended, and any emission queued during the failed pass is dropped, so
//!   the next pass reconciles from a consistent state.
//! - Re-entrant emission (the source changes while a pass runs): the newest
//!   value is queued and reconciled right after the current pass.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::AddAssign;
use std::rc::Rc;

use bindery_core::dispose::DisposeToken;
use bindery_core::tree::ViewTree;
use bindery_runtime::reactive::{Observable, Property, ReadProperty};

/// Counts of the work done by one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Retained cells that received a new value.
    pub updated: usize,
    /// Cells created at the tail.
    pub created: usize,
    /// Trailing cells removed.
    pub removed: usize,
    /// Retained cells whose view was rebuilt because the kind changed.
    pub replaced: usize,
}

impl ReconcileStats {
    /// Whether the pass changed the container's children.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        self.created + self.removed + self.replaced > 0
    }
}

impl AddAssign for ReconcileStats {
    fn add_assign(&mut self, rhs: Self) {
        self.updated += rhs.updated;
        self.created += rhs.created;
        self.removed += rhs.removed;
        self.replaced += rhs.replaced;
    }
}

struct ListCell<V: ViewTree, T, K> {
    node: V::Node,
    value: Observable<T>,
    kind: K,
}

type Classify<T, K> = Box<dyn Fn(&T) -> K>;
type Factory<V, T, K> = Box<dyn Fn(&V, &K, ReadProperty<T>) -> <V as ViewTree>::Node>;

/// Ends a reconciliation run, even when a factory panics.
struct BusyGuard<'a, T> {
    busy: &'a Cell<bool>,
    queued: &'a RefCell<Option<Vec<T>>>,
}

impl<T> Drop for BusyGuard<'_, T> {
    fn drop(&mut self) {
        self.busy.set(false);
        let stale = self.queued.take();
        drop(stale);
    }
}

/// Keeps a container's children in step with an array.
pub struct ListReconciler<V: ViewTree, T, K = ()> {
    tree: V,
    container: V::Node,
    classify: Classify<T, K>,
    factory: Factory<V, T, K>,
    cells: RefCell<Vec<ListCell<V, T, K>>>,
    busy: Cell<bool>,
    queued: RefCell<Option<Vec<T>>>,
    last: Cell<ReconcileStats>,
    total: Cell<ReconcileStats>,
}

impl<V, T> ListReconciler<V, T, ()>
where
    V: ViewTree,
    T: Clone + 'static,
{
    /// A reconciler whose children are all built by `factory`.
    pub fn new(
        tree: &V,
        container: &V::Node,
        factory: impl Fn(&V, ReadProperty<T>) -> V::Node + 'static,
    ) -> Self {
        Self::typed(tree, container, |_| (), move |tree, _, value| factory(tree, value))
    }
}

impl<V, T, K> ListReconciler<V, T, K>
where
    V: ViewTree,
    T: Clone + 'static,
    K: PartialEq + fmt::Debug + 'static,
{
    /// A reconciler that rebuilds a child whenever `classify` reports a new
    /// kind for its index.
    pub fn typed(
        tree: &V,
        container: &V::Node,
        classify: impl Fn(&T) -> K + 'static,
        factory: impl Fn(&V, &K, ReadProperty<T>) -> V::Node + 'static,
    ) -> Self {
        Self {
            tree: tree.clone(),
            container: container.clone(),
            classify: Box::new(classify),
            factory: Box::new(factory),
            cells: RefCell::new(Vec::new()),
            busy: Cell::new(false),
            queued: RefCell::new(None),
            last: Cell::new(ReconcileStats::default()),
            total: Cell::new(ReconcileStats::default()),
        }
    }

    #[must_use]
    pub fn container(&self) -> &V::Node {
        &self.container
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.borrow().is_empty()
    }

    /// Child views, in cell order.
    #[must_use]
    pub fn nodes(&self) -> Vec<V::Node> {
        self.cells.borrow().iter().map(|c| c.node.clone()).collect()
    }

    /// Current value of cell `index`.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<T> {
        let holder = self.cells.borrow().get(index).map(|c| c.value.clone());
        holder.map(|v| v.get())
    }

    /// Stats of the most recent pass.
    #[must_use]
    pub fn last_stats(&self) -> ReconcileStats {
        self.last.get()
    }

    /// Stats accumulated over every pass.
    #[must_use]
    pub fn total_stats(&self) -> ReconcileStats {
        self.total.get()
    }

    /// Bring the children in line with `items`.
    ///
    /// Called while a pass is already running, the items are queued and the
    /// returned stats are empty.
    pub fn reconcile(&self, items: &[T]) -> ReconcileStats {
        if self.busy.get() {
            *self.queued.borrow_mut() = Some(items.to_vec());
            return ReconcileStats::default();
        }
        self.busy.set(true);
        let _guard = BusyGuard {
            busy: &self.busy,
            queued: &self.queued,
        };

        let mut stats = self.pass(items);
        loop {
            let next = self.queued.borrow_mut().take();
            let Some(next) = next else {
                break;
            };
            stats += self.pass(&next);
        }
        stats
    }

    fn pass(&self, items: &[T]) -> ReconcileStats {
        let before = self.len();
        let _span = tracing::trace_span!("list.reconcile", from = before, to = items.len()).entered();
        let mut stats = ReconcileStats::default();

        // Retained indices.
        for (index, item) in items.iter().enumerate().take(before) {
            let kind = (self.classify)(item);
            let (holder, same_kind, old_node) = {
                let cells = self.cells.borrow();
                let cell = &cells[index];
                (cell.value.clone(), cell.kind == kind, cell.node.clone())
            };
            if same_kind {
                holder.set(item.clone());
                stats.updated += 1;
            } else {
                let cell = self.build(item, kind);
                self.tree.replace_child(&self.container, &old_node, &cell.node);
                self.cells.borrow_mut()[index] = cell;
                self.tree.release(&old_node);
                stats.replaced += 1;
            }
        }

        // Surplus.
        if before > items.len() {
            let surplus = self.cells.borrow_mut().split_off(items.len());
            for cell in surplus {
                if !self.tree.remove_child(&self.container, &cell.node) {
                    self.tree.detach(&cell.node);
                }
                self.tree.release(&cell.node);
                stats.removed += 1;
            }
        }

        // Growth.
        for item in items.iter().skip(before) {
            let kind = (self.classify)(item);
            let cell = self.build(item, kind);
            self.tree.append_child(&self.container, &cell.node);
            self.cells.borrow_mut().push(cell);
            stats.created += 1;
        }

        tracing::trace!(
            message = "list.reconcile",
            updated = stats.updated,
            created = stats.created,
            removed = stats.removed,
            replaced = stats.replaced,
        );
        self.last.set(stats);
        let mut total = self.total.get();
        total += stats;
        self.total.set(total);
        stats
    }

    fn build(&self, item: &T, kind: K) -> ListCell<V, T, K> {
        let value = Observable::new(item.clone());
        let node = (self.factory)(&self.tree, &kind, value.read_only());
        let holder = value.clone();
        self.tree
            .on_removed(&node, DisposeToken::new(move || holder.clear_subscribers()));
        ListCell { node, value, kind }
    }
}

impl<V: ViewTree, T, K> fmt::Debug for ListReconciler<V, T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListReconciler")
            .field("container", &self.container)
            .field("cells", &self.cells.borrow().len())
            .field("last", &self.last.get())
            .finish()
    }
}

/// Handle to a list bound with [`show_in`] or [`show_in_typed`].
pub struct ListView<V: ViewTree, T, K = ()> {
    reconciler: Rc<ListReconciler<V, T, K>>,
}

impl<V: ViewTree, T, K> Clone for ListView<V, T, K> {
    fn clone(&self) -> Self {
        Self {
            reconciler: Rc::clone(&self.reconciler),
        }
    }
}

impl<V: ViewTree, T, K> fmt::Debug for ListView<V, T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ListView").field(&self.reconciler).finish()
    }
}

impl<V, T, K> std::ops::Deref for ListView<V, T, K>
where
    V: ViewTree,
{
    type Target = ListReconciler<V, T, K>;

    fn deref(&self) -> &Self::Target {
        &self.reconciler
    }
}

/// Keep `container`'s children in step with `source`, building each child
/// with `factory`.
pub fn show_in<V, T, P>(
    tree: &V,
    container: &V::Node,
    source: &P,
    factory: impl Fn(&V, ReadProperty<T>) -> V::Node + 'static,
) -> ListView<V, T>
where
    V: ViewTree,
    T: Clone + 'static,
    P: Property<Vec<T>>,
{
    attach(tree, container, source, ListReconciler::new(tree, container, factory))
}

/// Like [`show_in`], rebuilding a child when `classify` changes its kind.
pub fn show_in_typed<V, T, K, P>(
    tree: &V,
    container: &V::Node,
    source: &P,
    classify: impl Fn(&T) -> K + 'static,
    factory: impl Fn(&V, &K, ReadProperty<T>) -> V::Node + 'static,
) -> ListView<V, T, K>
where
    V: ViewTree,
    T: Clone + 'static,
    K: PartialEq + fmt::Debug + 'static,
    P: Property<Vec<T>>,
{
    attach(
        tree,
        container,
        source,
        ListReconciler::typed(tree, container, classify, factory),
    )
}

fn attach<V, T, K, P>(
    tree: &V,
    container: &V::Node,
    source: &P,
    reconciler: ListReconciler<V, T, K>,
) -> ListView<V, T, K>
where
    V: ViewTree,
    T: Clone + 'static,
    K: PartialEq + fmt::Debug + 'static,
    P: Property<Vec<T>>,
{
    tree.add_class(container, "dynamic");
    let reconciler = Rc::new(reconciler);
    let driver = Rc::clone(&reconciler);
    let sub = source.listen_now(move |items| {
        driver.reconcile(items);
    });
    tree.on_removed(container, sub);
    ListView { reconciler }
}
