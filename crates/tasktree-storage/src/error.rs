//! Storage error types for tasktree-storage.

use tasktree_core::NodeId;
use thiserror::Error;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Applying schema migrations failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("process metadata not found: {0}")]
    MetadataNotFound(i64),

    #[error("designator not found: {0}")]
    DesignatorNotFound(i64),

    #[error("code not found: {0}")]
    CodeNotFound(i64),

    #[error("task tree node not found: {0}")]
    NodeNotFound(i64),

    /// The in-memory tree has no node with this id.
    #[error("node {node} is not in the task tree")]
    TreeNodeMissing { node: NodeId },

    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("invalid status {0:?}")]
    InvalidStatus(String),
}
