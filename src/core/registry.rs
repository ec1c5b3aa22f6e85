//! Concurrent task-id to status map.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::SchedulerError;
use crate::util::serde::{TaskId, TaskStatus};

/// Current status of every task the scheduler has seen.
///
/// Entries are never evicted. Writers for a given id are the scheduler (on
/// registration), the dispatcher (`Pending -> Running`) and the task's worker
/// (`Running -> terminal`); [`StatusRegistry::advance`] rejects anything else.
#[derive(Debug, Default)]
pub struct StatusRegistry {
    statuses: RwLock<HashMap<TaskId, TaskStatus>>,
}

impl StatusRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new task as `Pending`.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` if the id is already registered.
    pub fn register_pending(&self, task_id: &str) -> Result<(), SchedulerError> {
        let mut statuses = self.statuses.write();
        if let Some(current) = statuses.get(task_id) {
            return Err(SchedulerError::InvalidTransition {
                task_id: task_id.to_owned(),
                from: *current,
                to: TaskStatus::Pending,
            });
        }
        statuses.insert(task_id.to_owned(), TaskStatus::Pending);
        Ok(())
    }

    /// Move a task along its lifecycle, returning the previous status.
    ///
    /// # Errors
    ///
    /// `UnknownTask` if the id was never registered, `InvalidTransition` if
    /// `next` is not a legal successor of the current status.
    pub fn advance(&self, task_id: &str, next: TaskStatus) -> Result<TaskStatus, SchedulerError> {
        let mut statuses = self.statuses.write();
        let current = statuses
            .get_mut(task_id)
            .ok_or_else(|| SchedulerError::UnknownTask(task_id.to_owned()))?;
        if !current.can_transition_to(next) {
            return Err(SchedulerError::InvalidTransition {
                task_id: task_id.to_owned(),
                from: *current,
                to: next,
            });
        }
        Ok(std::mem::replace(current, next))
    }

    /// Unchecked last-write-wins update. Returns the previous status.
    pub fn set(&self, task_id: impl Into<TaskId>, status: TaskStatus) -> Option<TaskStatus> {
        self.statuses.write().insert(task_id.into(), status)
    }

    /// Current status of a task.
    pub fn get(&self, task_id: &str) -> Option<TaskStatus> {
        self.statuses.read().get(task_id).copied()
    }

    /// Number of tasks currently in `status`.
    pub fn count(&self, status: TaskStatus) -> usize {
        self.statuses.read().values().filter(|s| **s == status).count()
    }

    /// Number of tracked tasks.
    pub fn len(&self) -> usize {
        self.statuses.read().len()
    }

    /// Whether no task has been registered.
    pub fn is_empty(&self) -> bool {
        self.statuses.read().is_empty()
    }

    /// Independent copy of the whole map.
    pub fn snapshot(&self) -> HashMap<TaskId, TaskStatus> {
        self.statuses.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_full_lifecycle() {
        let reg = StatusRegistry::new();
        reg.register_pending("t1").unwrap();
        assert_eq!(reg.get("t1"), Some(TaskStatus::Pending));

        assert_eq!(reg.advance("t1", TaskStatus::Running).unwrap(), TaskStatus::Pending);
        assert_eq!(reg.advance("t1", TaskStatus::Failed).unwrap(), TaskStatus::Running);
        assert_eq!(reg.get("t1"), Some(TaskStatus::Failed));
    }

    #[test]
    fn test_rejects_regression_and_skips() {
        let reg = StatusRegistry::new();
        reg.register_pending("t1").unwrap();

        let err = reg.advance("t1", TaskStatus::Completed).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidTransition { .. }));

        reg.advance("t1", TaskStatus::Running).unwrap();
        reg.advance("t1", TaskStatus::Completed).unwrap();
        assert!(reg.advance("t1", TaskStatus::Running).is_err());
        assert!(reg.register_pending("t1").is_err());
        assert_eq!(reg.get("t1"), Some(TaskStatus::Completed));
    }

    #[test]
    fn test_unknown_task() {
        let reg = StatusRegistry::new();
        assert!(matches!(
            reg.advance("ghost", TaskStatus::Running),
            Err(SchedulerError::UnknownTask(id)) if id == "ghost"
        ));
        assert_eq!(reg.get("ghost"), None);
    }

    #[test]
    fn test_set_is_last_write_wins() {
        let reg = StatusRegistry::new();
        assert_eq!(reg.set("t", TaskStatus::Running), None);
        assert_eq!(reg.set("t", TaskStatus::Pending), Some(TaskStatus::Running));
        assert_eq!(reg.get("t"), Some(TaskStatus::Pending));
    }

    #[test]
    fn test_concurrent_writers_on_distinct_ids() {
        let reg = Arc::new(StatusRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|w| {
                let reg = Arc::clone(&reg);
                thread::spawn(move || {
                    for i in 0..100 {
                        let id = format!("{w}-{i}");
                        reg.register_pending(&id).unwrap();
                        reg.advance(&id, TaskStatus::Running).unwrap();
                        reg.advance(&id, TaskStatus::Completed).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(reg.len(), 800);
        assert_eq!(reg.count(TaskStatus::Completed), 800);
    }
}
