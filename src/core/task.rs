//! Task definition and its serializable descriptor.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{AppResult, TaskAction};
use crate::util::clock::now_ms;
use crate::util::serde::{generate_task_id, Priority, TaskId};

/// Immutable unit of work with a priority and a not-before time.
pub struct ScheduledTask {
    id: TaskId,
    name: String,
    priority: Priority,
    action: Box<dyn TaskAction>,
    estimated_duration: Duration,
    scheduled_time_ms: u128,
}

impl ScheduledTask {
    /// Create a task with a freshly generated id.
    ///
    /// `estimated_duration` is advisory and never enforced.
    pub fn new(
        name: impl Into<String>,
        priority: Priority,
        action: impl TaskAction,
        estimated_duration: Duration,
        scheduled_time_ms: u128,
    ) -> Self {
        Self {
            id: generate_task_id(),
            name: name.into(),
            priority,
            action: Box::new(action),
            estimated_duration,
            scheduled_time_ms,
        }
    }

    /// Create a task that is due as soon as it is enqueued.
    pub fn immediate(name: impl Into<String>, priority: Priority, action: impl TaskAction) -> Self {
        Self::new(name, priority, action, Duration::ZERO, now_ms())
    }

    /// Create a task due `delay` from now.
    pub fn delayed(
        name: impl Into<String>,
        priority: Priority,
        action: impl TaskAction,
        delay: Duration,
    ) -> Self {
        Self::new(name, priority, action, Duration::ZERO, now_ms() + delay.as_millis())
    }

    /// Replace the advisory duration estimate.
    #[must_use]
    pub const fn with_estimated_duration(mut self, estimated: Duration) -> Self {
        self.estimated_duration = estimated;
        self
    }

    /// Unique identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Priority class.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Advisory duration estimate.
    #[must_use]
    pub const fn estimated_duration(&self) -> Duration {
        self.estimated_duration
    }

    /// Instant (ms since epoch) before which the task must not start.
    #[must_use]
    pub const fn scheduled_time_ms(&self) -> u128 {
        self.scheduled_time_ms
    }

    /// Whether the task may start at `now_ms`.
    #[must_use]
    pub const fn is_due(&self, now_ms: u128) -> bool {
        self.scheduled_time_ms <= now_ms
    }

    /// Run the task's action once.
    pub async fn execute(&self) -> AppResult<()> {
        self.action.run().await
    }

    /// Action-free view of this task.
    #[must_use]
    pub fn descriptor(&self) -> TaskDescriptor {
        TaskDescriptor {
            id: self.id.clone(),
            name: self.name.clone(),
            priority: self.priority,
            estimated_duration_ms: u64::try_from(self.estimated_duration.as_millis())
                .unwrap_or(u64::MAX),
            scheduled_time_ms: self.scheduled_time_ms,
        }
    }
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("estimated_duration", &self.estimated_duration)
            .field("scheduled_time_ms", &self.scheduled_time_ms)
            .finish_non_exhaustive()
    }
}

/// Cloneable, serializable snapshot of a task without its action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDescriptor {
    /// Task identifier.
    pub id: TaskId,
    /// Display label.
    pub name: String,
    /// Priority class.
    pub priority: Priority,
    /// Advisory duration estimate in milliseconds.
    pub estimated_duration_ms: u64,
    /// Not-before instant in milliseconds since epoch.
    pub scheduled_time_ms: u128,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FnAction;

    #[test]
    fn test_descriptor_mirrors_task() {
        let task = ScheduledTask::new(
            "report",
            Priority::High,
            FnAction::new(|| Ok(())),
            Duration::from_millis(750),
            42,
        );
        let d = task.descriptor();
        assert_eq!(d.id, task.id());
        assert_eq!(d.name, "report");
        assert_eq!(d.priority, Priority::High);
        assert_eq!(d.estimated_duration_ms, 750);
        assert_eq!(d.scheduled_time_ms, 42);
    }

    #[test]
    fn test_is_due_boundary() {
        let task = ScheduledTask::new("t", Priority::Low, FnAction::new(|| Ok(())), Duration::ZERO, 100);
        assert!(!task.is_due(99));
        assert!(task.is_due(100));
        assert!(task.is_due(101));
    }

    #[tokio::test]
    async fn test_execute_propagates_action_error() {
        let task = ScheduledTask::immediate(
            "boom",
            Priority::Medium,
            FnAction::new(|| Err(anyhow::anyhow!("disk full"))),
        );
        let err = task.execute().await.unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }
}
