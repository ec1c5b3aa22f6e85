//! Persistence sink abstraction and in-process implementations.
//!
//! The scheduler reports every lifecycle step to a [`PersistenceSink`] but
//! never depends on the outcome: errors are logged and dropped.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use super::{ExecutionRecord, SchedulerError, TaskDescriptor};
use crate::util::serde::{TaskId, TaskStatus};

/// One call made against a persistence sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PersistenceEvent {
    /// A task was scheduled.
    TaskSaved {
        /// Task that was saved.
        task: TaskDescriptor,
        /// Status at save time.
        status: TaskStatus,
    },
    /// A task changed status.
    StatusUpdated {
        /// Task whose status changed.
        task_id: TaskId,
        /// New status.
        status: TaskStatus,
    },
    /// An execution finished.
    RecordSaved(ExecutionRecord),
}

/// Storage collaborator for task and execution records.
pub trait PersistenceSink: Send + Sync {
    /// Called once when a task is scheduled.
    ///
    /// # Errors
    ///
    /// Implementation-defined; the scheduler logs and ignores it.
    fn save_task(&self, task: &TaskDescriptor, status: TaskStatus) -> Result<(), SchedulerError>;

    /// Called on every status transition after scheduling.
    ///
    /// # Errors
    ///
    /// Implementation-defined; the scheduler logs and ignores it.
    fn update_status(&self, task_id: &str, status: TaskStatus) -> Result<(), SchedulerError>;

    /// Called once per finished execution.
    ///
    /// # Errors
    ///
    /// Implementation-defined; the scheduler logs and ignores it.
    fn save_execution_record(&self, record: &ExecutionRecord) -> Result<(), SchedulerError>;
}

impl<T: PersistenceSink + ?Sized> PersistenceSink for Arc<T> {
    fn save_task(&self, task: &TaskDescriptor, status: TaskStatus) -> Result<(), SchedulerError> {
        (**self).save_task(task, status)
    }

    fn update_status(&self, task_id: &str, status: TaskStatus) -> Result<(), SchedulerError> {
        (**self).update_status(task_id, status)
    }

    fn save_execution_record(&self, record: &ExecutionRecord) -> Result<(), SchedulerError> {
        (**self).save_execution_record(record)
    }
}

/// Apply an owned event to a sink.
pub(crate) fn apply_event(
    sink: &dyn PersistenceSink,
    event: &PersistenceEvent,
) -> Result<(), SchedulerError> {
    match event {
        PersistenceEvent::TaskSaved { task, status } => sink.save_task(task, *status),
        PersistenceEvent::StatusUpdated { task_id, status } => sink.update_status(task_id, *status),
        PersistenceEvent::RecordSaved(record) => sink.save_execution_record(record),
    }
}

/// Log a failed sink call without propagating it.
pub(crate) fn log_persistence_failure(operation: &str, result: Result<(), SchedulerError>) {
    if let Err(e) = result {
        tracing::warn!(operation, error = %e, "persistence sink call failed; continuing");
    }
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPersistence;

impl PersistenceSink for NoopPersistence {
    fn save_task(&self, _task: &TaskDescriptor, _status: TaskStatus) -> Result<(), SchedulerError> {
        Ok(())
    }

    fn update_status(&self, _task_id: &str, _status: TaskStatus) -> Result<(), SchedulerError> {
        Ok(())
    }

    fn save_execution_record(&self, _record: &ExecutionRecord) -> Result<(), SchedulerError> {
        Ok(())
    }
}

/// In-memory sink for testing and dev. Keeps the most recent `max_events`.
#[derive(Debug)]
pub struct InMemoryPersistence {
    events: Mutex<VecDeque<PersistenceEvent>>,
    max_events: usize,
}

impl InMemoryPersistence {
    /// Create a sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(max_events.min(4096))),
            max_events,
        }
    }

    /// Snapshot of stored events, oldest first.
    pub fn events(&self) -> Vec<PersistenceEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Every status reported for `task_id`, in call order, starting with
    /// the status it was saved with.
    pub fn status_trail(&self, task_id: &str) -> Vec<TaskStatus> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                PersistenceEvent::TaskSaved { task, status } if task.id == task_id => Some(*status),
                PersistenceEvent::StatusUpdated { task_id: id, status } if id == task_id => {
                    Some(*status)
                }
                _ => None,
            })
            .collect()
    }

    /// Ids in the order they were reported `Running`.
    pub fn dispatch_order(&self) -> Vec<TaskId> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                PersistenceEvent::StatusUpdated {
                    task_id,
                    status: TaskStatus::Running,
                } => Some(task_id.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: PersistenceEvent) {
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

impl Default for InMemoryPersistence {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl PersistenceSink for InMemoryPersistence {
    fn save_task(&self, task: &TaskDescriptor, status: TaskStatus) -> Result<(), SchedulerError> {
        self.push(PersistenceEvent::TaskSaved {
            task: task.clone(),
            status,
        });
        Ok(())
    }

    fn update_status(&self, task_id: &str, status: TaskStatus) -> Result<(), SchedulerError> {
        self.push(PersistenceEvent::StatusUpdated {
            task_id: task_id.to_owned(),
            status,
        });
        Ok(())
    }

    fn save_execution_record(&self, record: &ExecutionRecord) -> Result<(), SchedulerError> {
        self.push(PersistenceEvent::RecordSaved(record.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::serde::Priority;

    fn descriptor(id: &str) -> TaskDescriptor {
        TaskDescriptor {
            id: id.into(),
            name: format!("task-{id}"),
            priority: Priority::Low,
            estimated_duration_ms: 0,
            scheduled_time_ms: 0,
        }
    }

    #[test]
    fn test_status_trail() {
        let sink = InMemoryPersistence::default();
        sink.save_task(&descriptor("a"), TaskStatus::Pending).unwrap();
        sink.save_task(&descriptor("b"), TaskStatus::Pending).unwrap();
        sink.update_status("a", TaskStatus::Running).unwrap();
        sink.update_status("a", TaskStatus::Completed).unwrap();

        assert_eq!(
            sink.status_trail("a"),
            [TaskStatus::Pending, TaskStatus::Running, TaskStatus::Completed]
        );
        assert_eq!(sink.status_trail("b"), [TaskStatus::Pending]);
        assert_eq!(sink.dispatch_order(), ["a"]);
    }

    #[test]
    fn test_bounded_buffer_drops_oldest() {
        let sink = InMemoryPersistence::new(2);
        for id in ["a", "b", "c"] {
            sink.update_status(id, TaskStatus::Running).unwrap();
        }
        assert_eq!(sink.dispatch_order(), ["b", "c"]);
    }
}
