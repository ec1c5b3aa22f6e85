//! Serializable identifiers and enums shared by every scheduler component.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque short task identifier.
pub type TaskId = String;

/// Length of generated task identifiers.
pub const TASK_ID_LEN: usize = 8;

/// Generate a fresh task identifier (first eight hex digits of a v4 UUID).
#[must_use]
pub fn generate_task_id() -> TaskId {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(TASK_ID_LEN);
    id
}

/// Priority class of a task. Each class carries an integer weight.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    /// Background work (weight 1).
    Low,
    /// Default class (weight 5).
    #[default]
    Medium,
    /// Interactive work (weight 10).
    High,
    /// Must run before everything else that is due (weight 20).
    Critical,
}

impl Priority {
    /// All priority classes, lowest first.
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// Ordering weight; a strictly greater weight is dispatched first.
    #[must_use]
    pub const fn weight(self) -> u32 {
        match self {
            Self::Low => 1,
            Self::Medium => 5,
            Self::High => 10,
            Self::Critical => 20,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        };
        f.write_str(name)
    }
}

/// Lifecycle status of a task: `Pending -> Running -> {Completed, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    /// Queued, waiting for its scheduled time.
    Pending,
    /// Handed to the worker pool.
    Running,
    /// Action returned successfully.
    Completed,
    /// Action returned an error or panicked.
    Failed,
}

impl TaskStatus {
    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `self -> next` is a legal lifecycle edge.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running) | (Self::Running, Self::Completed | Self::Failed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_short_and_distinct() {
        let a = generate_task_id();
        let b = generate_task_id();
        assert_eq!(a.len(), TASK_ID_LEN);
        assert_ne!(a, b);
    }

    #[test]
    fn test_transition_table() {
        use TaskStatus::*;
        assert!(Pending.can_transition_to(Running));
        assert!(Running.can_transition_to(Completed));
        assert!(Running.can_transition_to(Failed));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Running.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Running));
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&TaskStatus::Completed).unwrap();
        assert_eq!(json, "\"COMPLETED\"");
    }
}
