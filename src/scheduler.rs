//! Grouped, cancellable task scheduler driven by a monotonic clock.
//!
//! The scheduler is the only way the reactor defers, repeats or
//! coordinates work.  It never spawns a thread: [`TaskScheduler::update`]
//! is called once per reactor iteration and runs every task that has
//! come due.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Work Sources                          │
//! │                                                              │
//! │  ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌──────────┐   │
//! │  │ Gesture   │  │ Periodic  │  │ Screen    │  │ Bus      │   │
//! │  │ timers    │  │ poll      │  │ idle      │  │ thread   │   │
//! │  └─────┬─────┘  └─────┬─────┘  └─────┬─────┘  └─────┬────┘   │
//! │        │ schedule     │              │              │ submit │
//! │        ▼              ▼              ▼              ▼        │
//! │  ┌───────────────────────────────────────┐   ┌───────────┐   │
//! │  │   due-time heap (reactor thread)      │◀──│ async     │   │
//! │  └───────────────────┬───────────────────┘   │ queue     │   │
//! │                      │                       │ (mutex)   │   │
//! │                      ▼                       └───────────┘   │
//! │              TaskScheduler::update()                         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ordering
//!
//! Due tasks run in non-decreasing due-time order, ties broken by
//! insertion order.  Anything scheduled while `update` is running waits
//! for the next `update`, even if it is already due.
//!
//! ## Repeats
//!
//! A repeating task is re-armed at `previous_due + delay`, so its cadence
//! stays aligned with the first firing instead of drifting with reactor
//! latency.  After a long stall the repeats that are already in the past
//! are dropped rather than replayed back to back.
//!
//! Delays longer than [`MAX_DELAY`] are clamped to it.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::trace;
use parking_lot::Mutex;

use crate::app::ports::TimePort;

// ═══════════════════════════════════════════════════════════════
//  Identifiers
// ═══════════════════════════════════════════════════════════════

/// Small integer tag shared by tasks that are cancelled together.
pub type GroupId = u8;

/// Group used by [`TaskScheduler::schedule`] and by async submissions.
pub const DEFAULT_GROUP: GroupId = GroupId::MAX;

const GROUP_SLOTS: usize = GroupId::MAX as usize + 1;

/// Longest delay a task can be armed with (about a century).
pub const MAX_DELAY: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Stable identity of a scheduled task (survives repeats).
pub type TaskId = u64;

type TaskFn<S> = Box<dyn FnMut(&mut S, &mut TaskContext<'_, S>)>;
type AsyncFn<S> = Box<dyn FnOnce(&mut S, &mut TaskContext<'_, S>) + Send>;

// ═══════════════════════════════════════════════════════════════
//  Task
// ═══════════════════════════════════════════════════════════════

enum Body<S> {
    /// Timer body; may ask to repeat.
    Timed(TaskFn<S>),
    /// Work handed over through an [`AsyncHandle`]; always one-shot.
    Once(Option<AsyncFn<S>>),
}

struct Task<S> {
    id: TaskId,
    /// Insertion sequence, the FIFO tie-break for equal due-times.
    seq: u64,
    due: Instant,
    delay: Duration,
    group: GroupId,
    /// Group epoch at insertion; a mismatch means the task was cancelled.
    epoch: u64,
    body: Body<S>,
}

impl<S> PartialEq for Task<S> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<S> Eq for Task<S> {}

impl<S> PartialOrd for Task<S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<S> Ord for Task<S> {
    // Reversed: BinaryHeap is a max-heap, we want the earliest first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

// ═══════════════════════════════════════════════════════════════
//  Task context
// ═══════════════════════════════════════════════════════════════

/// Handle passed to a running task body.
///
/// Dereferences to the scheduler, so a body can schedule follow-up work
/// or cancel groups while it runs.  Calling [`repeat`](Self::repeat)
/// re-arms the running task; without it the task is one-shot.
pub struct TaskContext<'a, S> {
    scheduler: &'a mut TaskScheduler<S>,
    group: GroupId,
    repeat: bool,
}

impl<S> TaskContext<'_, S> {
    /// Ask for another run one `delay` after this one's due-time.
    pub fn repeat(&mut self) {
        self.repeat = true;
    }

    pub fn group(&self) -> GroupId {
        self.group
    }
}

impl<S> Deref for TaskContext<'_, S> {
    type Target = TaskScheduler<S>;

    fn deref(&self) -> &Self::Target {
        self.scheduler
    }
}

impl<S> DerefMut for TaskContext<'_, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.scheduler
    }
}

// ═══════════════════════════════════════════════════════════════
//  Async handle
// ═══════════════════════════════════════════════════════════════

/// Thread-safe entry point into the reactor.
///
/// This is the only part of the scheduler that may be used from another
/// thread.  Submitted work runs on the reactor thread during the next
/// [`TaskScheduler::update`], in submission order.
pub struct AsyncHandle<S> {
    queue: Arc<Mutex<VecDeque<AsyncFn<S>>>>,
}

impl<S> AsyncHandle<S> {
    pub fn submit<F>(&self, body: F)
    where
        F: FnOnce(&mut S, &mut TaskContext<'_, S>) + Send + 'static,
    {
        self.queue.lock().push_back(Box::new(body));
    }

    /// Number of submissions not yet picked up by `update`.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }
}

impl<S> Clone for AsyncHandle<S> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}

impl<S> fmt::Debug for AsyncHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncHandle")
            .field("pending", &self.pending())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler
// ═══════════════════════════════════════════════════════════════

/// Deferred / periodic task queue over state `S`.
///
/// Task bodies receive `&mut S` plus a [`TaskContext`]; the scheduler
/// owns the closures, so bodies capture plain indices rather than
/// references into `S`.
pub struct TaskScheduler<S> {
    clock: Box<dyn TimePort>,
    queue: BinaryHeap<Task<S>>,
    epochs: Vec<u64>,
    async_queue: Arc<Mutex<VecDeque<AsyncFn<S>>>>,
    next_id: TaskId,
    next_seq: u64,
}

impl<S> TaskScheduler<S> {
    pub fn new(clock: impl TimePort + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            queue: BinaryHeap::new(),
            epochs: vec![0; GROUP_SLOTS],
            async_queue: Arc::new(Mutex::new(VecDeque::new())),
            next_id: 0,
            next_seq: 0,
        }
    }

    /// Current reading of the scheduler's clock.
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Run `body` once after `delay`, in the default group.
    pub fn schedule<F>(&mut self, delay: Duration, body: F) -> TaskId
    where
        F: FnMut(&mut S, &mut TaskContext<'_, S>) + 'static,
    {
        self.schedule_in_group(delay, DEFAULT_GROUP, body)
    }

    /// Run `body` once after `delay`, tagged with `group`.
    pub fn schedule_in_group<F>(&mut self, delay: Duration, group: GroupId, body: F) -> TaskId
    where
        F: FnMut(&mut S, &mut TaskContext<'_, S>) + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        let delay = delay.min(MAX_DELAY);
        let due = deadline(self.clock.now(), delay);
        self.push(Task {
            id,
            seq: 0,
            due,
            delay,
            group,
            epoch: self.epochs[group as usize],
            body: Body::Timed(Box::new(body)),
        });
        trace!("scheduler: task {} armed in group {} ({:?})", id, group, delay);
        id
    }

    /// A cloneable, thread-safe handle for [`AsyncHandle::submit`].
    pub fn async_handle(&self) -> AsyncHandle<S> {
        AsyncHandle {
            queue: Arc::clone(&self.async_queue),
        }
    }

    /// Invalidate every live task in `group`.  Idempotent.
    ///
    /// Tasks already popped for the current `update` pass are skipped too,
    /// and a running task of the group will not re-arm.
    pub fn cancel_group(&mut self, group: GroupId) {
        self.epochs[group as usize] += 1;
        self.queue.retain(|t| t.group != group);
    }

    /// Number of live tasks waiting in `group`.
    pub fn pending_in_group(&self, group: GroupId) -> usize {
        self.queue
            .iter()
            .filter(|t| t.group == group && self.is_live(t))
            .count()
    }

    /// Number of live tasks waiting in any group (async work excluded).
    pub fn len(&self) -> usize {
        self.queue.iter().filter(|t| self.is_live(t)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Execute everything that is due.  Call once per reactor iteration.
    pub fn update(&mut self, state: &mut S) {
        let now = self.clock.now();
        self.drain_async(now);

        let mut due = Vec::new();
        while self.queue.peek().is_some_and(|t| t.due <= now) {
            if let Some(task) = self.queue.pop() {
                due.push(task);
            }
        }

        for task in due {
            self.run(task, now, state);
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn push(&mut self, mut task: Task<S>) {
        task.seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(task);
    }

    fn is_live(&self, task: &Task<S>) -> bool {
        task.epoch == self.epochs[task.group as usize]
    }

    fn drain_async(&mut self, now: Instant) {
        let submitted: Vec<AsyncFn<S>> = self.async_queue.lock().drain(..).collect();
        for body in submitted {
            let id = self.next_id;
            self.next_id += 1;
            self.push(Task {
                id,
                seq: 0,
                due: now,
                delay: Duration::ZERO,
                group: DEFAULT_GROUP,
                epoch: self.epochs[DEFAULT_GROUP as usize],
                body: Body::Once(Some(body)),
            });
        }
    }

    fn run(&mut self, mut task: Task<S>, now: Instant, state: &mut S) {
        if !self.is_live(&task) {
            trace!("scheduler: task {} cancelled in group {}", task.id, task.group);
            return;
        }

        let mut ctx = TaskContext {
            scheduler: self,
            group: task.group,
            repeat: false,
        };
        let repeatable = match &mut task.body {
            Body::Timed(body) => {
                body(state, &mut ctx);
                true
            }
            Body::Once(body) => {
                if let Some(body) = body.take() {
                    body(state, &mut ctx);
                }
                false
            }
        };
        let repeat = ctx.repeat;

        // A body that cancelled its own group does not come back.
        if !repeatable || !repeat || !self.is_live(&task) {
            return;
        }

        let mut next = deadline(task.due, task.delay);
        while next < now {
            let after = deadline(next, task.delay);
            if after <= next {
                break;
            }
            next = after;
        }
        task.due = next;
        self.push(task);
    }
}

/// `from + delay`, saturating at `from` when the clock cannot represent it.
fn deadline(from: Instant, delay: Duration) -> Instant {
    from.checked_add(delay).unwrap_or(from)
}

impl<S> fmt::Debug for TaskScheduler<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("queued", &self.queue.len())
            .field("async_pending", &self.async_queue.lock().len())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
