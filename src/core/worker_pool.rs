//! Adaptive worker pool with dedicated OS threads.
//!
//! The pool keeps `min_workers` threads alive, spawns more (up to
//! `max_workers`) while every live worker is busy, and retires idle workers
//! above the floor after `keep_alive`. Excess submissions wait in an
//! unbounded backlog; there is no admission control.
//!
//! # Example
//!
//! ```rust,ignore
//! use prometheus_task_scheduler::config::WorkerPoolConfig;
//! use prometheus_task_scheduler::core::WorkerPool;
//!
//! let pool = WorkerPool::new(
//!     WorkerPoolConfig::new().with_min_workers(2).with_max_workers(8),
//!     my_executor, // implements WorkerExecutor<Job>
//! )?;
//! pool.submit(job)?;
//! pool.shutdown();
//! pool.await_termination(Duration::from_secs(5));
//! ```

mod native;

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Errors that can occur when using a `WorkerPool`.
#[derive(Debug)]
pub enum PoolError {
    /// The pool has been shut down.
    PoolShutdown,

    /// Configuration validation failed.
    InvalidConfig(String),

    /// Internal error (thread spawn failure, runtime construction, etc.).
    Internal(String),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PoolShutdown => write!(f, "pool has been shut down"),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for PoolError {}

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Live worker threads.
    pub worker_count: usize,

    /// Units currently executing.
    pub active_tasks: usize,

    /// Units waiting in the backlog.
    pub queued_tasks: usize,

    /// Units that ran to completion (including ones that panicked).
    pub completed_tasks: u64,

    /// Units whose execution panicked.
    pub panicked_tasks: u64,

    /// Units accepted by `submit`.
    pub submitted_tasks: u64,
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub live_workers: AtomicUsize,
    pub active_tasks: AtomicUsize,
    pub queued_tasks: AtomicUsize,
    pub completed_tasks: AtomicU64,
    pub panicked_tasks: AtomicU64,
    pub submitted_tasks: AtomicU64,
}

impl PoolCounters {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self) -> PoolStats {
        PoolStats {
            worker_count: self.live_workers.load(Ordering::Acquire),
            active_tasks: self.active_tasks.load(Ordering::Acquire),
            queued_tasks: self.queued_tasks.load(Ordering::Acquire),
            completed_tasks: self.completed_tasks.load(Ordering::Relaxed),
            panicked_tasks: self.panicked_tasks.load(Ordering::Relaxed),
            submitted_tasks: self.submitted_tasks.load(Ordering::Relaxed),
        }
    }

    /// Reserve a worker slot if fewer than `max` are live.
    pub fn try_reserve_worker(&self, max: usize) -> bool {
        self.live_workers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
            .is_ok()
    }

    /// Give up a worker slot if more than `min` are live.
    pub fn try_retire_worker(&self, min: usize) -> bool {
        self.live_workers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n > min).then(|| n - 1))
            .is_ok()
    }
}

/// Marks one unit as active for as long as it lives.
///
/// The decrement runs in `Drop`, so the gauge stays accurate even when the
/// unit panics.
pub(crate) struct ActiveGuard<'a> {
    active: &'a AtomicUsize,
}

impl<'a> ActiveGuard<'a> {
    pub fn enter(active: &'a AtomicUsize) -> Self {
        active.fetch_add(1, Ordering::AcqRel);
        Self { active }
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A unit of work travelling through the backlog.
#[derive(Debug)]
pub(crate) struct WorkerJob<P> {
    /// Pool-local sequence number, for logging.
    pub id: u64,
    /// Payload handed to the executor.
    pub payload: P,
}

pub(crate) use native::panic_message;
pub use native::WorkerPool;
