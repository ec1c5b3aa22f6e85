//! Error types for scheduler operations.

use thiserror::Error;

use crate::core::worker_pool::PoolError;
use crate::util::serde::{TaskId, TaskStatus};

/// Errors produced by scheduler components.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The scheduler no longer accepts tasks.
    #[error("scheduler has been shut down")]
    ShutDown,
    /// A status change would break the `Pending -> Running -> terminal` order.
    #[error("invalid status transition for task {task_id}: {from} -> {to}")]
    InvalidTransition {
        /// Task whose status was being changed.
        task_id: TaskId,
        /// Status currently recorded.
        from: TaskStatus,
        /// Status that was requested.
        to: TaskStatus,
    },
    /// No status has ever been recorded for this task.
    #[error("unknown task: {0}")]
    UnknownTask(TaskId),
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A persistence collaborator reported a failure.
    #[error("persistence error: {0}")]
    Persistence(String),
    /// The worker pool rejected an operation.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Application-facing result using anyhow; task actions return this.
pub type AppResult<T> = Result<T, anyhow::Error>;
