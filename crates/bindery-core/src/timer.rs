#![forbid(unsafe_code)]

//! Deferred callbacks for animation fallbacks and debouncing.
//!
//! Bindery never blocks and never spawns: anything that must happen later is
//! handed to a [`Scheduler`] owned by the host event loop.
//!
//! - [`ManualScheduler`]: virtual clock advanced explicitly. Deterministic;
//!   used by tests and headless hosts.
//! - [`InstantScheduler`]: wall-clock deadlines (`web_time::Instant`), run by
//!   calling [`InstantScheduler::pump`] from the host loop.
//!
//! # Invariants
//!
//! 1. Tasks run in deadline order; ties run in scheduling order.
//! 2. A canceled task never runs.
//! 3. No queue borrow is held while a task runs, so tasks may schedule or
//!    cancel other tasks.

use std::cell::{Cell, RefCell};
use std::collections::BinaryHeap;
use std::cmp::{Ordering, Reverse};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use ahash::AHashSet;
use web_time::Instant;

use crate::dispose::Disposable;

/// Identifier of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// A one-shot deferred task.
pub type Task = Box<dyn FnOnce()>;

/// Host-provided deferred execution.
pub trait Scheduler {
    /// Run `task` once, `delay` from now.
    fn schedule(&self, delay: Duration, task: Task) -> TimerId;

    /// Cancel a pending task. Returns `false` if it already ran or was unknown.
    fn cancel(&self, id: TimerId) -> bool;

    /// Number of tasks still pending.
    fn pending(&self) -> usize;
}

/// Token canceling a scheduled task when disposed.
pub struct TimerGuard {
    scheduler: Rc<dyn Scheduler>,
    id: Option<TimerId>,
}

impl TimerGuard {
    pub fn new(scheduler: &Rc<dyn Scheduler>, id: TimerId) -> Self {
        Self {
            scheduler: Rc::clone(scheduler),
            id: Some(id),
        }
    }
}

impl Disposable for TimerGuard {
    fn dispose(&mut self) {
        if let Some(id) = self.id.take() {
            self.scheduler.cancel(id);
        }
    }

    fn is_disposed(&self) -> bool {
        self.id.is_none()
    }
}

impl fmt::Debug for TimerGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerGuard").field("id", &self.id).finish()
    }
}

// ---------------------------------------------------------------------------
// TimerQueue
// ---------------------------------------------------------------------------

struct Entry<T> {
    due: T,
    seq: u64,
    id: TimerId,
}

impl<T: Ord> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<T: Ord> Eq for Entry<T> {}

impl<T: Ord> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Ord> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due
            .cmp(&other.due)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Deadline-ordered task storage shared by both schedulers.
struct TimerQueue<T> {
    heap: BinaryHeap<Reverse<Entry<T>>>,
    tasks: ahash::AHashMap<TimerId, Task>,
    canceled: AHashSet<TimerId>,
    next_seq: u64,
}

impl<T: Ord + Copy> TimerQueue<T> {
    fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            tasks: ahash::AHashMap::new(),
            canceled: AHashSet::new(),
            next_seq: 0,
        }
    }

    fn push(&mut self, due: T, task: Task) -> TimerId {
        self.next_seq += 1;
        let id = TimerId(self.next_seq);
        self.heap.push(Reverse(Entry {
            due,
            seq: self.next_seq,
            id,
        }));
        self.tasks.insert(id, task);
        id
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        if self.tasks.remove(&id).is_some() {
            self.canceled.insert(id);
            true
        } else {
            false
        }
    }

    /// Pop the next task due at or before `now`.
    fn pop_due(&mut self, now: T) -> Option<(T, Task)> {
        loop {
            let Reverse(head) = self.heap.peek()?;
            if head.due > now {
                return None;
            }
            let Reverse(entry) = self.heap.pop()?;
            if self.canceled.remove(&entry.id) {
                continue;
            }
            if let Some(task) = self.tasks.remove(&entry.id) {
                return Some((entry.due, task));
            }
        }
    }

    fn next_due(&mut self) -> Option<T> {
        while let Some(Reverse(head)) = self.heap.peek() {
            if self.canceled.contains(&head.id) {
                let id = head.id;
                self.heap.pop();
                self.canceled.remove(&id);
                continue;
            }
            return Some(head.due);
        }
        None
    }

    fn len(&self) -> usize {
        self.tasks.len()
    }
}

// ---------------------------------------------------------------------------
// ManualScheduler
// ---------------------------------------------------------------------------

/// Scheduler driven by a virtual clock.
///
/// ```
/// # use std::rc::Rc;
/// # use std::cell::Cell;
/// # use std::time::Duration;
/// # use bindery_core::timer::{ManualScheduler, Scheduler};
/// let scheduler = ManualScheduler::new();
/// let fired = Rc::new(Cell::new(false));
/// let f = Rc::clone(&fired);
/// scheduler.schedule(Duration::from_millis(10), Box::new(move || f.set(true)));
/// scheduler.advance(Duration::from_millis(9));
/// assert!(!fired.get());
/// scheduler.advance(Duration::from_millis(1));
/// assert!(fired.get());
/// ```
pub struct ManualScheduler {
    now: Cell<Duration>,
    queue: RefCell<TimerQueue<Duration>>,
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Cell::new(Duration::ZERO),
            queue: RefCell::new(TimerQueue::new()),
        }
    }

    /// Elapsed virtual time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Move the clock forward by `by`, running every task that becomes due.
    ///
    /// Tasks scheduled by running tasks also run if they fall inside the
    /// window. Returns the number of tasks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now.get() + by;
        let mut ran = 0;
        loop {
            let next = self.queue.borrow_mut().pop_due(target);
            let Some((due, task)) = next else {
                break;
            };
            self.now.set(due.max(self.now.get()));
            task();
            ran += 1;
        }
        self.now.set(target);
        ran
    }

    /// Run every pending task regardless of deadline.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        loop {
            let due = self.queue.borrow_mut().next_due();
            let Some(due) = due else {
                break;
            };
            ran += self.advance(due.saturating_sub(self.now.get()));
        }
        ran
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TimerId {
        let due = self.now.get() + delay;
        self.queue.borrow_mut().push(due, task)
    }

    fn cancel(&self, id: TimerId) -> bool {
        self.queue.borrow_mut().cancel(id)
    }

    fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("now", &self.now.get())
            .field("pending", &self.pending())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// InstantScheduler
// ---------------------------------------------------------------------------

/// Wall-clock scheduler pumped by the host loop.
pub struct InstantScheduler {
    queue: RefCell<TimerQueue<Instant>>,
}

impl Default for InstantScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl InstantScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: RefCell::new(TimerQueue::new()),
        }
    }

    /// Run every task whose deadline has passed. Returns the number run.
    pub fn pump(&self) -> usize {
        self.pump_at(Instant::now())
    }

    fn pump_at(&self, now: Instant) -> usize {
        let mut ran = 0;
        loop {
            let next = self.queue.borrow_mut().pop_due(now);
            let Some((_, task)) = next else {
                break;
            };
            task();
            ran += 1;
        }
        ran
    }

    /// Time until the next pending deadline, if any.
    #[must_use]
    pub fn time_until_next(&self) -> Option<Duration> {
        let due = self.queue.borrow_mut().next_due()?;
        Some(due.saturating_duration_since(Instant::now()))
    }
}

impl Scheduler for InstantScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TimerId {
        let due = Instant::now() + delay;
        self.queue.borrow_mut().push(due, task)
    }

    fn cancel(&self, id: TimerId) -> bool {
        self.queue.borrow_mut().cancel(id)
    }

    fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

impl fmt::Debug for InstantScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstantScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}
