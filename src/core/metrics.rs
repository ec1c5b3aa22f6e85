//! Point-in-time system metrics.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Aggregate view over the queue, pool, counters and history.
///
/// Derived on demand; never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetrics {
    /// Tasks waiting in the queue.
    pub pending_tasks: usize,
    /// Workers currently running an action.
    pub active_workers: usize,
    /// Live worker threads.
    pub pool_size: usize,
    /// Cumulative successful executions.
    pub completed_tasks: u64,
    /// Cumulative failed executions.
    pub failed_tasks: u64,
    /// Execution records in history.
    pub total_executions: usize,
}

impl fmt::Display for SystemMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pending={} active={} pool={} completed={} failed={} executions={}",
            self.pending_tasks,
            self.active_workers,
            self.pool_size,
            self.completed_tasks,
            self.failed_tasks,
            self.total_executions
        )
    }
}
