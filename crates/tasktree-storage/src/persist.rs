//! Writing a recorded task tree into a [`TaskStore`].
//!
//! For every node the code row goes in first (preceded by its designator
//! when the call's `self` argument is one), then the node row referencing
//! it and the caller-supplied parent, then, when recursive, the children in
//! initiation order. Each insert is preceded by a metadata tag.

use tasktree_core::{NodeId, TaskTree};

use crate::error::StorageError;
use crate::traits::TaskStore;
use crate::types::{CodeId, CodeRow, DesignatorRow, NodeRow, PersistedId, ProcessMetadata};

/// How much of the tree to write and where to attach it.
#[derive(Debug, Clone)]
pub struct PersistOptions {
    pub recursive: bool,
    /// Persisted parent of the first node; `None` stores it as a root.
    pub parent_id: Option<PersistedId>,
    /// Total reported to the progress callback. Defaults to the number of
    /// nodes that will be written.
    pub total: Option<usize>,
    pub metadata: ProcessMetadata,
}

impl Default for PersistOptions {
    fn default() -> Self {
        PersistOptions {
            recursive: true,
            parent_id: None,
            total: None,
            metadata: ProcessMetadata::current("task tree"),
        }
    }
}

/// Reported once per persisted node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistProgress {
    pub done: usize,
    pub total: usize,
}

struct Persister<'a, 'p, S: ?Sized> {
    tree: &'a TaskTree,
    store: &'a mut S,
    metadata: &'a ProcessMetadata,
    recursive: bool,
    total: usize,
    done: usize,
    progress: Option<&'p mut dyn FnMut(PersistProgress)>,
}

/// Persists `node` (and its subtree when `options.recursive`) and returns
/// the id the store assigned to `node`.
///
/// Writes are not atomic across nodes: on error, rows written so far stay.
pub fn persist<S: TaskStore + ?Sized>(
    tree: &TaskTree,
    node: NodeId,
    store: &mut S,
    options: &PersistOptions,
    progress: Option<&mut dyn FnMut(PersistProgress)>,
) -> Result<PersistedId, StorageError> {
    if !tree.contains(node) {
        return Err(StorageError::TreeNodeMissing { node });
    }
    let total = options.total.unwrap_or_else(|| {
        if options.recursive {
            tree.subtree_size(node)
        } else {
            1
        }
    });

    let mut persister = Persister {
        tree,
        store,
        metadata: &options.metadata,
        recursive: options.recursive,
        total,
        done: 0,
        progress,
    };
    let id = persister.node(node, options.parent_id)?;
    tracing::info!(root = %id, nodes = persister.done, "persisted task tree");
    Ok(id)
}

impl<S: TaskStore + ?Sized> Persister<'_, '_, S> {
    fn node(
        &mut self,
        id: NodeId,
        parent: Option<PersistedId>,
    ) -> Result<PersistedId, StorageError> {
        let tree = self.tree;
        let node = tree
            .node(id)
            .ok_or(StorageError::TreeNodeMissing { node: id })?;

        let code_id = self.code(id)?;
        let metadata_id = self.store.insert_metadata(self.metadata)?;
        let row = NodeRow {
            start_time: node.start_time(),
            end_time: node.end_time(),
            status: node.status(),
            reason: node.failure().map(|f| f.kind.name().to_string()),
            metadata_id,
        };
        let persisted = self.store.insert_node(&row, code_id, parent)?;

        self.done += 1;
        if let Some(progress) = self.progress.as_mut() {
            progress(PersistProgress {
                done: self.done,
                total: self.total,
            });
        }

        if self.recursive {
            for child in tree.children(id) {
                self.node(child, Some(persisted))?;
            }
        }
        Ok(persisted)
    }

    fn code(&mut self, id: NodeId) -> Result<CodeId, StorageError> {
        let tree = self.tree;
        let record = tree
            .node(id)
            .ok_or(StorageError::TreeNodeMissing { node: id })?
            .record();

        let designator_id = match record.designator() {
            Some((designator_type, document)) => {
                let metadata_id = self.store.insert_metadata(self.metadata)?;
                Some(self.store.insert_designator(&DesignatorRow {
                    designator_type: designator_type.to_string(),
                    document,
                    metadata_id,
                })?)
            }
            None => None,
        };

        let metadata_id = self.store.insert_metadata(self.metadata)?;
        self.store.insert_code(&CodeRow {
            function: record.operation().to_string(),
            designator_id,
            metadata_id,
        })
    }
}
