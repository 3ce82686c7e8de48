//! Storage-layer row types and identifiers.
//!
//! Ids are assigned by the store on insert. The inner `i64` aligns with
//! SQLite's `INTEGER PRIMARY KEY`; the in-memory backend starts at 1 too.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tasktree_core::TaskStatus;

macro_rules! row_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(
                Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
            )]
            pub struct $name(pub i64);

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

row_id!(
    /// Id of a stored [`ProcessMetadata`] row.
    MetadataId,
    /// Id of a stored designator document.
    DesignatorId,
    /// Id of a stored code row.
    CodeId,
    /// Id of a stored task tree node. Children reference their parent by it.
    PersistedId,
);

/// Tags every row written during one persistence run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessMetadata {
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub description: String,
    pub version: String,
}

impl ProcessMetadata {
    /// Metadata for the running process: creator from `USER`, the crate
    /// version, stamped now.
    pub fn current(description: impl Into<String>) -> Self {
        ProcessMetadata {
            created_at: Utc::now(),
            created_by: std::env::var("USER").unwrap_or_else(|_| "unknown".to_string()),
            description: description.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// A designator bound as the `self` argument of a recorded call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignatorRow {
    pub designator_type: String,
    pub document: Value,
    pub metadata_id: MetadataId,
}

/// The persisted form of a call record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeRow {
    pub function: String,
    pub designator_id: Option<DesignatorId>,
    pub metadata_id: MetadataId,
}

/// The persisted form of a task tree node, minus its links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRow {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    /// Failure kind name, e.g. `ReachabilityFailure`.
    pub reason: Option<String>,
    pub metadata_id: MetadataId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCode {
    pub id: CodeId,
    pub function: String,
    pub designator_id: Option<DesignatorId>,
    pub metadata_id: MetadataId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredNode {
    pub id: PersistedId,
    pub code_id: CodeId,
    pub parent_id: Option<PersistedId>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub reason: Option<String>,
    pub metadata_id: MetadataId,
}

impl StoredNode {
    pub(crate) fn from_row(
        id: PersistedId,
        row: &NodeRow,
        code_id: CodeId,
        parent_id: Option<PersistedId>,
    ) -> Self {
        StoredNode {
            id,
            code_id,
            parent_id,
            start_time: row.start_time,
            end_time: row.end_time,
            status: row.status,
            reason: row.reason.clone(),
            metadata_id: row.metadata_id,
        }
    }
}
