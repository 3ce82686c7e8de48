//! A single recorded call and its lifecycle.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::code::CallRecord;
use crate::error::PlanFailure;
use crate::status::TaskStatus;

/// One call's lifecycle record.
///
/// Tree structure (children, parent) is owned by the
/// [`TaskTree`](crate::TaskTree) arena, not by the node.
#[derive(Debug, Clone)]
pub struct TaskTreeNode {
    record: CallRecord,
    status: TaskStatus,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    failure: Option<PlanFailure>,
}

impl TaskTreeNode {
    /// A fresh node in the `Created` state with no timestamps.
    pub fn new(record: CallRecord) -> Self {
        TaskTreeNode {
            record,
            status: TaskStatus::Created,
            start_time: None,
            end_time: None,
            failure: None,
        }
    }

    pub fn record(&self) -> &CallRecord {
        &self.record
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn failure(&self) -> Option<&PlanFailure> {
        self.failure.as_ref()
    }

    /// `Created -> Running`, stamping the start time.
    pub(crate) fn start(&mut self, now: DateTime<Utc>) {
        if self.status == TaskStatus::Created {
            self.status = TaskStatus::Running;
            self.start_time = Some(now);
        }
    }

    /// `Running -> Succeeded`.
    pub(crate) fn succeed(&mut self) {
        if self.status == TaskStatus::Running {
            self.status = TaskStatus::Succeeded;
        }
    }

    /// `Running -> Failed`, keeping the failure as the reason.
    pub(crate) fn fail(&mut self, failure: PlanFailure) {
        if self.status == TaskStatus::Running {
            self.status = TaskStatus::Failed;
            self.failure = Some(failure);
        }
    }

    /// Stamps the end time once, and only after a start time exists.
    pub(crate) fn finish(&mut self, now: DateTime<Utc>) {
        if self.start_time.is_some() && self.end_time.is_none() {
            self.end_time = Some(now);
        }
    }
}

impl fmt::Display for TaskTreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stamp =
            |t: Option<DateTime<Utc>>| t.map_or_else(|| "None".to_string(), |t| t.to_rfc3339());
        writeln!(f, "Code: {}", self.record)?;
        writeln!(f, "start_time: {}", stamp(self.start_time))?;
        writeln!(f, "Status: {}", self.status)?;
        write!(f, "end_time: {}", stamp(self.end_time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_success() {
        let mut node = TaskTreeNode::new(CallRecord::no_operation());
        assert_eq!(node.status(), TaskStatus::Created);
        assert!(node.start_time().is_none());

        let t0 = Utc::now();
        node.start(t0);
        assert_eq!(node.status(), TaskStatus::Running);
        node.succeed();
        node.finish(t0 + chrono::Duration::milliseconds(5));

        assert_eq!(node.status(), TaskStatus::Succeeded);
        assert!(node.end_time().unwrap() >= node.start_time().unwrap());
    }

    #[test]
    fn terminal_states_do_not_transition() {
        let mut node = TaskTreeNode::new(CallRecord::no_operation());
        node.start(Utc::now());
        node.fail(PlanFailure::generic("stuck"));
        node.succeed();
        assert_eq!(node.status(), TaskStatus::Failed);
        assert_eq!(node.failure().unwrap().message, "stuck");
    }

    #[test]
    fn end_time_requires_start_time() {
        let mut node = TaskTreeNode::new(CallRecord::no_operation());
        node.finish(Utc::now());
        assert!(node.end_time().is_none());
    }

    #[test]
    fn display_lists_code_and_status() {
        let node = TaskTreeNode::new(CallRecord::no_operation());
        let text = node.to_string();
        assert!(text.starts_with("Code: no_operation()"));
        assert!(text.contains("Status: CREATED"));
    }
}
