//! The [`TaskStore`] trait defining the storage contract for task trees.
//!
//! Writes are one row per call and each call is its own unit of work;
//! [`persist`](crate::persist::persist) composes them into a whole-tree
//! save. Reads exist for inspection and verification.

use crate::error::StorageError;
use crate::types::{
    CodeId, CodeRow, DesignatorId, DesignatorRow, MetadataId, NodeRow, PersistedId,
    ProcessMetadata, StoredCode, StoredNode,
};

/// The storage contract for persisted task trees.
///
/// Synchronous; persistence runs on the caller's thread.
pub trait TaskStore {
    // -------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------

    /// Stores a metadata tag. Called before every other insert so each row
    /// can reference the run that wrote it.
    fn insert_metadata(&mut self, metadata: &ProcessMetadata) -> Result<MetadataId, StorageError>;

    fn insert_designator(&mut self, row: &DesignatorRow) -> Result<DesignatorId, StorageError>;

    fn insert_code(&mut self, row: &CodeRow) -> Result<CodeId, StorageError>;

    /// Inserts a node referencing `code` and, unless it is a root, its
    /// already persisted `parent`.
    fn insert_node(
        &mut self,
        row: &NodeRow,
        code: CodeId,
        parent: Option<PersistedId>,
    ) -> Result<PersistedId, StorageError>;

    // -------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------

    fn get_metadata(&self, id: MetadataId) -> Result<ProcessMetadata, StorageError>;

    fn get_designator(&self, id: DesignatorId) -> Result<DesignatorRow, StorageError>;

    fn get_code(&self, id: CodeId) -> Result<StoredCode, StorageError>;

    fn get_node(&self, id: PersistedId) -> Result<StoredNode, StorageError>;

    /// Nodes whose parent is `parent` (roots for `None`), in insertion order.
    fn children_of(&self, parent: Option<PersistedId>) -> Result<Vec<StoredNode>, StorageError>;

    fn count_nodes(&self) -> Result<usize, StorageError>;
}
