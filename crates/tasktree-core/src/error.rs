//! Error types for instrumented calls.
//!
//! [`PlanFailure`] is the recognized domain failure: the recorder annotates
//! it into the task tree before handing it back to the caller. Everything
//! else that can come out of an instrumented call is a [`TaskError`] variant
//! the recorder passes through without annotating the node.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Categories of the plan failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FailureKind {
    #[default]
    Generic,
    Reachability,
    ObjectUnfetchable,
    ObjectNotFound,
    NavigationGoalNotReached,
    GripperClosedCompletely,
    IkError,
}

impl FailureKind {
    /// Stable type name, persisted as the node's failure reason.
    pub fn name(&self) -> &'static str {
        match self {
            FailureKind::Generic => "PlanFailure",
            FailureKind::Reachability => "ReachabilityFailure",
            FailureKind::ObjectUnfetchable => "ObjectUnfetchable",
            FailureKind::ObjectNotFound => "PerceptionObjectNotFound",
            FailureKind::NavigationGoalNotReached => "NavigationGoalNotReached",
            FailureKind::GripperClosedCompletely => "GripperClosedCompletely",
            FailureKind::IkError => "IKError",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A recoverable, explainable problem during plan execution.
///
/// `Display` prints the message only; that text becomes the node's
/// `failure_reason`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct PlanFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl PlanFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        PlanFailure {
            kind,
            message: message.into(),
        }
    }

    /// A failure of the generic `PlanFailure` kind.
    pub fn generic(message: impl Into<String>) -> Self {
        PlanFailure::new(FailureKind::Generic, message)
    }
}

/// Argument binding errors, raised before any node is created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// The caller passed a name the signature does not declare.
    #[error("{operation}() got an unexpected argument '{name}'")]
    UnexpectedArgument { operation: String, name: String },

    /// A parameter without default was not passed.
    #[error("{operation}() missing required argument '{name}'")]
    MissingArgument { operation: String, name: String },

    /// An argument could not be read back as the requested type.
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },
}

/// Errors returned by instrumented callables.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Domain plan failure; recorded into the node before propagating.
    #[error(transparent)]
    Plan(#[from] PlanFailure),

    /// Arguments did not match the callable's signature.
    #[error(transparent)]
    Binding(#[from] BindError),

    /// Any other failure. Propagates without annotating the node.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl TaskError {
    /// Wraps an arbitrary error as an unrecognized failure.
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TaskError::Other(Box::new(err))
    }

    /// The plan failure, if this error belongs to the domain taxonomy.
    pub fn as_plan_failure(&self) -> Option<&PlanFailure> {
        match self {
            TaskError::Plan(failure) => Some(failure),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_failure_displays_message_only() {
        let failure = PlanFailure::new(FailureKind::Reachability, "obstacle detected");
        assert_eq!(failure.to_string(), "obstacle detected");
        assert_eq!(failure.kind.name(), "ReachabilityFailure");
    }

    #[test]
    fn task_error_is_transparent_for_plan_failures() {
        let err: TaskError = PlanFailure::generic("gripper empty").into();
        assert_eq!(err.to_string(), "gripper empty");
        assert!(err.as_plan_failure().is_some());
    }

    #[test]
    fn other_errors_are_not_plan_failures() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "socket closed");
        let err = TaskError::other(io);
        assert!(err.as_plan_failure().is_none());
        assert_eq!(err.to_string(), "socket closed");
    }

    #[test]
    fn bind_error_messages() {
        let err = BindError::MissingArgument {
            operation: "navigate".into(),
            name: "target".into(),
        };
        assert_eq!(err.to_string(), "navigate() missing required argument 'target'");
    }
}
