//! Concurrent priority queue of pending tasks.

use parking_lot::Mutex;

use super::{ScheduledTask, TaskDescriptor};
use crate::infra::queue::InMemoryQueue;

/// Abstraction for queue backends.
///
/// Backends order due tasks by priority weight (descending), then scheduled
/// time (ascending), then insertion order. A backend must never hand out a
/// task whose scheduled time is later than the `now_ms` it was asked about.
pub trait TaskQueue: Send {
    /// Insert a task.
    fn enqueue(&mut self, task: ScheduledTask);
    /// Highest-ordered task that is due at `now_ms`, without removing it.
    fn peek_due(&mut self, now_ms: u128) -> Option<&ScheduledTask>;
    /// Remove and return the highest-ordered task that is due at `now_ms`.
    fn pop_due(&mut self, now_ms: u128) -> Option<ScheduledTask>;
    /// Number of tasks held, due or not.
    fn len(&self) -> usize;
    /// Whether the queue holds no tasks.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Thread-safe wrapper around a [`TaskQueue`] backend.
///
/// Every operation takes the internal mutex, so concurrent `pop_due` callers
/// can never receive the same task.
pub struct PriorityTaskQueue<Q = InMemoryQueue> {
    inner: Mutex<Q>,
}

impl<Q: TaskQueue> PriorityTaskQueue<Q> {
    /// Wrap a backend.
    pub const fn new(backend: Q) -> Self {
        Self {
            inner: Mutex::new(backend),
        }
    }

    /// Insert a task. Safe from any number of producers.
    pub fn enqueue(&self, task: ScheduledTask) {
        self.inner.lock().enqueue(task);
    }

    /// Descriptor of the next task that would be popped at `now_ms`.
    pub fn peek_due(&self, now_ms: u128) -> Option<TaskDescriptor> {
        self.inner.lock().peek_due(now_ms).map(ScheduledTask::descriptor)
    }

    /// Atomically remove the next due task.
    pub fn pop_due(&self, now_ms: u128) -> Option<ScheduledTask> {
        self.inner.lock().pop_due(now_ms)
    }

    /// Pending task count.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl Default for PriorityTaskQueue<InMemoryQueue> {
    fn default() -> Self {
        Self::new(InMemoryQueue::new())
    }
}
