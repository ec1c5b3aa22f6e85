//! Per-task execution on a pool worker.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{info, warn};

use super::persistence::log_persistence_failure;
use super::worker_pool::panic_message;
use super::{ExecutionRecord, ScheduledTask, SchedulerCore, WorkerExecutor};
use crate::util::serde::TaskStatus;

/// Message recorded when an action fails without saying why.
pub const UNKNOWN_FAILURE_MESSAGE: &str = "task action failed";

/// Runs a task's action and records its outcome.
///
/// This is the single boundary where action failures (errors and panics) are
/// caught and turned into a `Failed` record.
#[derive(Clone)]
pub(crate) struct TaskRunner {
    core: Arc<SchedulerCore>,
}

impl TaskRunner {
    pub(crate) const fn new(core: Arc<SchedulerCore>) -> Self {
        Self { core }
    }
}

#[async_trait]
impl WorkerExecutor<ScheduledTask> for TaskRunner {
    async fn execute(&self, task: ScheduledTask) {
        let start_ms = self.core.clock.now_ms();
        info!(task_id = %task.id(), name = task.name(), priority = %task.priority(), "Executing task");

        let outcome = AssertUnwindSafe(task.execute()).catch_unwind().await;
        let end_ms = self.core.clock.now_ms();

        let record = match outcome {
            Ok(Ok(())) => {
                info!(task_id = %task.id(), name = task.name(), "Task completed");
                ExecutionRecord::completed(task.id(), task.name(), start_ms, end_ms)
            }
            Ok(Err(err)) => {
                let message = failure_message(format!("{err:#}"));
                warn!(task_id = %task.id(), name = task.name(), error = %message, "Task failed");
                ExecutionRecord::failed(task.id(), task.name(), start_ms, end_ms, message)
            }
            Err(panic) => {
                let message = format!("task panicked: {}", panic_message(panic.as_ref()));
                warn!(task_id = %task.id(), name = task.name(), error = %message, "Task failed");
                ExecutionRecord::failed(task.id(), task.name(), start_ms, end_ms, message)
            }
        };

        self.core.finish(record);
    }
}

fn failure_message(message: String) -> String {
    if message.trim().is_empty() {
        UNKNOWN_FAILURE_MESSAGE.to_string()
    } else {
        message
    }
}

impl SchedulerCore {
    /// Count, record and publish a finished execution.
    ///
    /// The history append comes last, so once a record is visible its status,
    /// counters and sink calls are already in place.
    pub(crate) fn finish(&self, record: ExecutionRecord) {
        let status = record.status();
        if let Err(e) = self.registry.advance(record.task_id(), status) {
            warn!(task_id = %record.task_id(), error = %e, "Unexpected final status transition");
        }
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        match status {
            TaskStatus::Failed => self.counters.record_failed(),
            _ => self.counters.record_completed(),
        }
        log_persistence_failure("update_status", self.sink.update_status(record.task_id(), status));
        log_persistence_failure("save_execution_record", self.sink.save_execution_record(&record));
        self.history.append(record);
    }

    /// Finish a task that reached `Running` but could not be handed to a worker.
    pub(crate) fn fail_unexecuted(&self, task_id: &str, task_name: &str, reason: &str) {
        let now = self.clock.now_ms();
        self.finish(ExecutionRecord::failed(task_id, task_name, now, now, reason));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_messages_are_replaced() {
        assert_eq!(failure_message(String::new()), UNKNOWN_FAILURE_MESSAGE);
        assert_eq!(failure_message("  ".into()), UNKNOWN_FAILURE_MESSAGE);
        assert_eq!(failure_message("timeout".into()), "timeout");
    }
}
