//! API-facing response models for a dashboard that polls the scheduler.
//!
//! Field names follow the dashboard's JSON contract (`pendingTasks`,
//! `activeThreads`, ...), which predates the core's own naming.

use serde::{Deserialize, Serialize};

use crate::core::{DispatcherState, ExecutionRecord, SystemMetrics, TaskScheduler};
use crate::util::serde::{TaskId, TaskStatus};

/// Metrics payload served at `/api/metrics`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResponse {
    /// Tasks waiting in the queue.
    pub pending_tasks: usize,
    /// Workers running an action.
    pub active_threads: usize,
    /// Live worker threads.
    pub total_threads: usize,
    /// Cumulative successful executions.
    pub completed_tasks: u64,
    /// Cumulative failed executions.
    pub failed_tasks: u64,
    /// Execution records in history.
    pub total_executions: usize,
}

impl From<&SystemMetrics> for MetricsResponse {
    fn from(m: &SystemMetrics) -> Self {
        Self {
            pending_tasks: m.pending_tasks,
            active_threads: m.active_workers,
            total_threads: m.pool_size,
            completed_tasks: m.completed_tasks,
            failed_tasks: m.failed_tasks,
            total_executions: m.total_executions,
        }
    }
}

/// One row of the `/api/history` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Task identifier.
    pub task_id: TaskId,
    /// Task display name.
    pub task_name: String,
    /// Final status.
    pub status: TaskStatus,
    /// Duration in milliseconds; 0 when unknown.
    pub duration: u64,
    /// Error message; empty on success.
    pub error: String,
}

impl From<&ExecutionRecord> for HistoryEntry {
    fn from(r: &ExecutionRecord) -> Self {
        Self {
            task_id: r.task_id().to_owned(),
            task_name: r.task_name().to_owned(),
            status: r.status(),
            duration: r
                .duration_ms()
                .map_or(0, |d| u64::try_from(d).unwrap_or(u64::MAX)),
            error: r.error_message().unwrap_or_default().to_owned(),
        }
    }
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag: the scheduler accepts work.
    pub ok: bool,
    /// Dispatch loop state.
    pub dispatcher: DispatcherState,
}

/// Build the metrics payload.
#[must_use]
pub fn metrics_response(scheduler: &TaskScheduler) -> MetricsResponse {
    MetricsResponse::from(&scheduler.metrics())
}

/// Build the history payload, oldest first.
#[must_use]
pub fn history_response(scheduler: &TaskScheduler) -> Vec<HistoryEntry> {
    scheduler
        .execution_history()
        .iter()
        .map(HistoryEntry::from)
        .collect()
}

/// Serialize the metrics payload.
///
/// # Errors
///
/// JSON serialization failure.
pub fn metrics_json(scheduler: &TaskScheduler) -> Result<String, serde_json::Error> {
    serde_json::to_string(&metrics_response(scheduler))
}

/// Serialize the history payload.
///
/// # Errors
///
/// JSON serialization failure.
pub fn history_json(scheduler: &TaskScheduler) -> Result<String, serde_json::Error> {
    serde_json::to_string(&history_response(scheduler))
}

/// Return a health payload.
#[must_use]
pub fn health(scheduler: &TaskScheduler) -> Health {
    Health {
        ok: scheduler.is_accepting(),
        dispatcher: scheduler.dispatcher_state(),
    }
}
