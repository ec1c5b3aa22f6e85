//! Execution records, the append-only history, and outcome counters.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::util::serde::{TaskId, TaskStatus};

/// Outcome of one task execution. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    task_id: TaskId,
    task_name: String,
    status: TaskStatus,
    start_ms: u128,
    end_ms: Option<u128>,
    error_message: Option<String>,
}

impl ExecutionRecord {
    /// Record for an action that returned successfully.
    pub fn completed(
        task_id: impl Into<TaskId>,
        task_name: impl Into<String>,
        start_ms: u128,
        end_ms: u128,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            task_name: task_name.into(),
            status: TaskStatus::Completed,
            start_ms,
            end_ms: Some(end_ms),
            error_message: None,
        }
    }

    /// Record for an action that failed with `error_message`.
    pub fn failed(
        task_id: impl Into<TaskId>,
        task_name: impl Into<String>,
        start_ms: u128,
        end_ms: u128,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            task_name: task_name.into(),
            status: TaskStatus::Failed,
            start_ms,
            end_ms: Some(end_ms),
            error_message: Some(error_message.into()),
        }
    }

    /// Task identifier.
    #[must_use]
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Task display name.
    #[must_use]
    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    /// Final status (`Completed` or `Failed`).
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Start instant, ms since epoch.
    #[must_use]
    pub const fn start_ms(&self) -> u128 {
        self.start_ms
    }

    /// End instant, ms since epoch, if the execution finished.
    #[must_use]
    pub const fn end_ms(&self) -> Option<u128> {
        self.end_ms
    }

    /// `end - start`, or `None` without an end instant.
    #[must_use]
    pub fn duration_ms(&self) -> Option<u128> {
        self.end_ms.map(|end| end.saturating_sub(self.start_ms))
    }

    /// Failure message; present iff the status is `Failed`.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

/// Append-only log of execution records.
///
/// Readers receive independent copies, unaffected by later appends.
#[derive(Debug, Default)]
pub struct ExecutionHistory {
    records: RwLock<Vec<ExecutionRecord>>,
}

impl ExecutionHistory {
    /// Create an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record.
    pub fn append(&self, record: ExecutionRecord) {
        self.records.write().push(record);
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Copy of every record, in insertion order.
    pub fn snapshot(&self) -> Vec<ExecutionRecord> {
        self.records.read().clone()
    }
}

/// Cumulative outcome counters (lock-free atomics).
#[derive(Debug, Default)]
pub struct ExecutionCounters {
    completed: AtomicU64,
    failed: AtomicU64,
}

impl ExecutionCounters {
    /// Create zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one successful execution.
    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::AcqRel);
    }

    /// Count one failed execution.
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::AcqRel);
    }

    /// Successful executions so far.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    /// Failed executions so far.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Acquire)
    }
}
