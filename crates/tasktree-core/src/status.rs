//! Lifecycle status of a task tree node.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of one recorded call.
///
/// Transitions: `Created -> Running -> (Succeeded | Failed)`. A node never
/// leaves `Succeeded` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Created,
    Running,
    Succeeded,
    Failed,
}

impl TaskStatus {
    /// The stable upper-case name used in documents and persisted rows.
    pub fn name(&self) -> &'static str {
        match self {
            TaskStatus::Created => "CREATED",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Succeeded => "SUCCEEDED",
            TaskStatus::Failed => "FAILED",
        }
    }

    /// Parses a name produced by [`TaskStatus::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "CREATED" => Some(TaskStatus::Created),
            "RUNNING" => Some(TaskStatus::Running),
            "SUCCEEDED" => Some(TaskStatus::Succeeded),
            "FAILED" => Some(TaskStatus::Failed),
            _ => None,
        }
    }

    /// Whether the status is final.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
