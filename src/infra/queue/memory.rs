//! In-memory queue with priority and scheduled-time awareness.
//!
//! Tasks live in one of two binary heaps:
//!
//! - `waiting`: not yet due, ordered by scheduled time (earliest first);
//! - `ready`: due, ordered by priority weight, then scheduled time, then
//!   insertion order.
//!
//! Every `peek_due`/`pop_due` first promotes waiting tasks whose time has come.
//! A future high-priority task therefore never hides a due low-priority one.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::core::{ScheduledTask, TaskQueue};

struct QueuedTask {
    seq: u64,
    task: ScheduledTask,
}

/// Heap entry ordered so that the earliest scheduled time is at the top.
struct ByTime(QueuedTask);

/// Heap entry ordered so that the highest-priority due task is at the top.
struct ByPriority(QueuedTask);

impl PartialEq for ByTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ByTime {}

impl PartialOrd for ByTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ByTime {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for max-heap: earlier time wins, FIFO on ties.
        other
            .0
            .task
            .scheduled_time_ms()
            .cmp(&self.0.task.scheduled_time_ms())
            .then_with(|| other.0.seq.cmp(&self.0.seq))
    }
}

impl PartialEq for ByPriority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ByPriority {}

impl PartialOrd for ByPriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ByPriority {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (&self.0, &other.0);
        a.task
            .priority()
            .weight()
            .cmp(&b.task.priority().weight())
            .then_with(|| b.task.scheduled_time_ms().cmp(&a.task.scheduled_time_ms()))
            .then_with(|| b.seq.cmp(&a.seq))
    }
}

/// In-memory queue storing scheduled tasks in two priority heaps.
/// Enqueue and dequeue are O(log n) amortized.
pub struct InMemoryQueue {
    waiting: BinaryHeap<ByTime>,
    ready: BinaryHeap<ByPriority>,
    /// Every entry in `ready` is due at this instant.
    ready_as_of_ms: u128,
    next_seq: u64,
}

impl InMemoryQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty queue with room for `capacity` tasks.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            waiting: BinaryHeap::with_capacity(capacity.min(1024)),
            ready: BinaryHeap::new(),
            ready_as_of_ms: 0,
            next_seq: 0,
        }
    }

    /// Move tasks between heaps so that `ready` holds exactly the due ones.
    fn refresh(&mut self, now_ms: u128) {
        if now_ms < self.ready_as_of_ms {
            // Clock went backwards: hand back anything no longer due.
            let (still_due, not_due): (Vec<_>, Vec<_>) = self
                .ready
                .drain()
                .partition(|entry| entry.0.task.is_due(now_ms));
            self.ready.extend(still_due);
            self.waiting.extend(not_due.into_iter().map(|entry| ByTime(entry.0)));
        }
        self.ready_as_of_ms = now_ms;

        while self
            .waiting
            .peek()
            .is_some_and(|head| head.0.task.is_due(now_ms))
        {
            if let Some(ByTime(entry)) = self.waiting.pop() {
                self.ready.push(ByPriority(entry));
            }
        }
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue for InMemoryQueue {
    fn enqueue(&mut self, task: ScheduledTask) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.waiting.push(ByTime(QueuedTask { seq, task }));
    }

    fn peek_due(&mut self, now_ms: u128) -> Option<&ScheduledTask> {
        self.refresh(now_ms);
        self.ready.peek().map(|entry| &entry.0.task)
    }

    fn pop_due(&mut self, now_ms: u128) -> Option<ScheduledTask> {
        self.refresh(now_ms);
        self.ready.pop().map(|entry| entry.0.task)
    }

    fn len(&self) -> usize {
        self.waiting.len() + self.ready.len()
    }
}
