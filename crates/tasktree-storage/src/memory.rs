//! In-memory implementation of [`TaskStore`].
//!
//! [`InMemoryStore`] keeps rows in insertion-ordered vectors, with ids
//! handed out from 1 like SQLite's rowids. Links are checked the way the
//! SQLite backend's foreign keys check them.

use crate::error::StorageError;
use crate::traits::TaskStore;
use crate::types::{
    CodeId, CodeRow, DesignatorId, DesignatorRow, MetadataId, NodeRow, PersistedId,
    ProcessMetadata, StoredCode, StoredNode,
};

/// Vec-backed [`TaskStore`] for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    metadata: Vec<ProcessMetadata>,
    designators: Vec<DesignatorRow>,
    code: Vec<StoredCode>,
    nodes: Vec<StoredNode>,
}

/// Maps a 1-based row id to a vector slot.
fn slot(id: i64) -> Option<usize> {
    usize::try_from(id).ok()?.checked_sub(1)
}

fn next_id(len: usize) -> i64 {
    len as i64 + 1
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore::default()
    }

    fn check_metadata(&self, id: MetadataId) -> Result<(), StorageError> {
        slot(id.0)
            .and_then(|i| self.metadata.get(i))
            .map(|_| ())
            .ok_or(StorageError::MetadataNotFound(id.0))
    }
}

impl TaskStore for InMemoryStore {
    fn insert_metadata(&mut self, metadata: &ProcessMetadata) -> Result<MetadataId, StorageError> {
        let id = MetadataId(next_id(self.metadata.len()));
        self.metadata.push(metadata.clone());
        Ok(id)
    }

    fn insert_designator(&mut self, row: &DesignatorRow) -> Result<DesignatorId, StorageError> {
        self.check_metadata(row.metadata_id)?;
        let id = DesignatorId(next_id(self.designators.len()));
        self.designators.push(row.clone());
        Ok(id)
    }

    fn insert_code(&mut self, row: &CodeRow) -> Result<CodeId, StorageError> {
        self.check_metadata(row.metadata_id)?;
        if let Some(designator) = row.designator_id {
            self.get_designator(designator)?;
        }
        let id = CodeId(next_id(self.code.len()));
        self.code.push(StoredCode {
            id,
            function: row.function.clone(),
            designator_id: row.designator_id,
            metadata_id: row.metadata_id,
        });
        Ok(id)
    }

    fn insert_node(
        &mut self,
        row: &NodeRow,
        code: CodeId,
        parent: Option<PersistedId>,
    ) -> Result<PersistedId, StorageError> {
        self.check_metadata(row.metadata_id)?;
        self.get_code(code)?;
        if let Some(parent) = parent {
            self.get_node(parent)?;
        }
        let id = PersistedId(next_id(self.nodes.len()));
        self.nodes.push(StoredNode::from_row(id, row, code, parent));
        Ok(id)
    }

    fn get_metadata(&self, id: MetadataId) -> Result<ProcessMetadata, StorageError> {
        slot(id.0)
            .and_then(|i| self.metadata.get(i))
            .cloned()
            .ok_or(StorageError::MetadataNotFound(id.0))
    }

    fn get_designator(&self, id: DesignatorId) -> Result<DesignatorRow, StorageError> {
        slot(id.0)
            .and_then(|i| self.designators.get(i))
            .cloned()
            .ok_or(StorageError::DesignatorNotFound(id.0))
    }

    fn get_code(&self, id: CodeId) -> Result<StoredCode, StorageError> {
        slot(id.0)
            .and_then(|i| self.code.get(i))
            .cloned()
            .ok_or(StorageError::CodeNotFound(id.0))
    }

    fn get_node(&self, id: PersistedId) -> Result<StoredNode, StorageError> {
        slot(id.0)
            .and_then(|i| self.nodes.get(i))
            .cloned()
            .ok_or(StorageError::NodeNotFound(id.0))
    }

    fn children_of(&self, parent: Option<PersistedId>) -> Result<Vec<StoredNode>, StorageError> {
        Ok(self
            .nodes
            .iter()
            .filter(|node| node.parent_id == parent)
            .cloned()
            .collect())
    }

    fn count_nodes(&self) -> Result<usize, StorageError> {
        Ok(self.nodes.len())
    }
}
