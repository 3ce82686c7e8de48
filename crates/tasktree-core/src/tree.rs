//! The task tree context: node arena plus the live cursor.
//!
//! [`TaskTree`] owns every node in a `StableGraph` arena. Edges point from
//! parent to child and carry the child's ordinal, so children come back in
//! call-initiation order. A node's parent is its single incoming edge; it is
//! never used to own or free anything.
//!
//! The cursor (`current`) always names the innermost in-flight instrumented
//! call, or the root when none is in flight. Each logical call stack owns its
//! own `TaskTree` and passes it `&mut` down the call chain.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction};
use serde_json::{json, Value};

use crate::argument::Arguments;
use crate::code::CallRecord;
use crate::error::TaskError;
use crate::export::{ExportPhase, TraceExporter};
use crate::id::NodeId;
use crate::node::TaskTreeNode;

/// Ownership edge from parent to child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChildEdge {
    ordinal: u64,
}

/// Recorder context: all nodes of the trace plus the cursor.
pub struct TaskTree {
    graph: StableGraph<TaskTreeNode, ChildEdge, Directed, u32>,
    /// The root installed by the last `reset`.
    origin: NodeId,
    cursor: NodeId,
    next_ordinal: u64,
    /// Bumped on every reset so stale frames do not touch reused indices.
    generation: u64,
    exporter: Option<Arc<dyn TraceExporter>>,
}

impl TaskTree {
    /// Creates a tree with a fresh running `no_operation` root.
    pub fn new() -> Self {
        let mut tree = TaskTree {
            graph: StableGraph::default(),
            origin: NodeId(0),
            cursor: NodeId(0),
            next_ordinal: 0,
            generation: 0,
            exporter: None,
        };
        tree.reset();
        tree
    }

    /// Builder-style exporter installation.
    pub fn with_exporter(mut self, exporter: Arc<dyn TraceExporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn set_exporter(&mut self, exporter: Option<Arc<dyn TraceExporter>>) {
        self.exporter = exporter;
    }

    /// Discards every node and installs a fresh root, status `Running`.
    pub fn reset(&mut self) {
        self.graph.clear();
        self.generation += 1;
        let root = self.add_root(CallRecord::no_operation());
        if let Some(node) = self.graph.node_weight_mut(root.into()) {
            node.start(Utc::now());
        }
        self.origin = root;
        self.cursor = root;
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    /// Number of resets so far. Node ids from an earlier generation may
    /// have been reused and must not be acted on.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The node of the innermost in-flight call.
    pub fn current(&self) -> NodeId {
        self.cursor
    }

    /// Root of the tree the cursor is in.
    pub fn root(&self) -> NodeId {
        self.root_of(self.cursor)
    }

    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut id = id;
        while let Some(parent) = self.parent(id) {
            id = parent;
        }
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&TaskTreeNode> {
        self.graph.node_weight(id.into())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.graph.contains_node(id.into())
    }

    /// Number of live nodes in the arena, across all roots.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        if !self.contains(id) {
            return None;
        }
        self.graph
            .neighbors_directed(id.into(), Direction::Incoming)
            .next()
            .map(NodeId::from)
    }

    /// Children in call-initiation order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut edges: Vec<(u64, NodeId)> = self
            .graph
            .edges_directed(id.into(), Direction::Outgoing)
            .map(|edge| (edge.weight().ordinal, NodeId::from(edge.target())))
            .collect();
        edges.sort_unstable_by_key(|(ordinal, _)| *ordinal);
        edges.into_iter().map(|(_, child)| child).collect()
    }

    /// 1 plus the subtree size of every child; 0 for an unknown id.
    pub fn subtree_size(&self, id: NodeId) -> usize {
        if !self.contains(id) {
            return 0;
        }
        1 + self
            .children(id)
            .into_iter()
            .map(|child| self.subtree_size(child))
            .sum::<usize>()
    }

    /// Depth-first pre-order walk, children in initiation order.
    pub fn preorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        if !self.contains(id) {
            return order;
        }
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            order.push(next);
            stack.extend(self.children(next).into_iter().rev());
        }
        order
    }

    pub fn leaves(&self, id: NodeId) -> Vec<NodeId> {
        self.preorder(id)
            .into_iter()
            .filter(|node| self.children(*node).is_empty())
            .collect()
    }

    // -------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------

    /// Adds a detached root in the `Created` state. The cursor is unchanged.
    pub fn add_root(&mut self, record: CallRecord) -> NodeId {
        NodeId::from(self.graph.add_node(TaskTreeNode::new(record)))
    }

    /// Moves the cursor to `id`. Returns false, leaving the cursor alone,
    /// if `id` is not in the arena.
    pub fn rebind(&mut self, id: NodeId) -> bool {
        if self.contains(id) {
            self.cursor = id;
            true
        } else {
            false
        }
    }

    /// Removes `id` and all of its descendants.
    ///
    /// Discarding the origin root is a [`reset`](Self::reset). If the cursor
    /// was inside the removed subtree it moves to the removed node's parent,
    /// or to the origin root.
    pub fn discard(&mut self, id: NodeId) -> usize {
        if id == self.origin {
            let removed = self.subtree_size(id);
            self.reset();
            return removed;
        }
        let parent = self.parent(id);
        let doomed = self.preorder(id);
        let cursor_removed = doomed.contains(&self.cursor);
        for node in &doomed {
            self.graph.remove_node((*node).into());
        }
        if cursor_removed {
            self.cursor = parent.unwrap_or(self.origin);
        }
        doomed.len()
    }

    // -------------------------------------------------------------------
    // Serialization
    // -------------------------------------------------------------------

    /// The node document: call, status, timestamps, ids, failure reason.
    pub fn serialize(&self, id: NodeId) -> Option<Value> {
        let node = self.node(id)?;
        Some(json!({
            "call": node.record().serialize(),
            "status": node.status().name(),
            "start_time": node.start_time().map(|t| t.to_rfc3339()),
            "end_time": node.end_time().map(|t| t.to_rfc3339()),
            "id": id.0,
            "parent_id": self.parent(id).map(|parent| parent.0),
            "failure_reason": node.failure().map(|failure| failure.to_string()),
        }))
    }

    /// Node documents nested under `children`, in child order.
    pub fn serialize_tree(&self, id: NodeId) -> Option<Value> {
        let mut document = self.serialize(id)?;
        let children: Vec<Value> = self
            .children(id)
            .into_iter()
            .filter_map(|child| self.serialize_tree(child))
            .collect();
        document["children"] = Value::Array(children);
        Some(document)
    }

    fn export(&self, phase: ExportPhase, id: NodeId) {
        if let Some(exporter) = &self.exporter {
            if let Some(document) = self.serialize(id) {
                exporter.export(phase, &document);
            }
        }
    }

    // -------------------------------------------------------------------
    // Call bracketing
    // -------------------------------------------------------------------

    /// Records `record` as a new child of the cursor and runs `body` inside it.
    ///
    /// The node is `Running` while `body` runs. `Ok` marks it `Succeeded`;
    /// a [`TaskError::Plan`] marks it `Failed` with the failure as reason.
    /// Other errors and panics leave the status untouched. In every case the
    /// end time is stamped and the cursor returns to the parent.
    pub fn with_tree<T, F>(&mut self, record: CallRecord, body: F) -> Result<T, TaskError>
    where
        F: FnOnce(&mut TaskTree, &Arguments) -> Result<T, TaskError>,
    {
        let arguments = record.arguments().clone();
        let (node, parent) = self.enter(record);
        let frame = Frame {
            generation: self.generation,
            tree: self,
            node,
            parent,
        };

        let result = body(&mut *frame.tree, &arguments);

        if frame.is_live() {
            match &result {
                Ok(_) => {
                    if let Some(weight) = frame.tree.graph.node_weight_mut(node.into()) {
                        weight.succeed();
                    }
                }
                Err(TaskError::Plan(failure)) => {
                    if let Some(weight) = frame.tree.graph.node_weight_mut(node.into()) {
                        tracing::error!(
                            code = %weight.record(),
                            reason = %failure,
                            kind = %failure.kind,
                            "task execution failed"
                        );
                        weight.fail(failure.clone());
                    }
                }
                Err(_) => {}
            }
        }
        result
    }

    fn enter(&mut self, record: CallRecord) -> (NodeId, NodeId) {
        let parent = self.cursor;
        let node = NodeId::from(self.graph.add_node(TaskTreeNode::new(record)));
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        self.graph
            .add_edge(parent.into(), node.into(), ChildEdge { ordinal });
        self.cursor = node;
        if let Some(weight) = self.graph.node_weight_mut(node.into()) {
            weight.start(Utc::now());
        }
        self.export(ExportPhase::Entry, node);
        (node, parent)
    }

    fn exit(&mut self, node: NodeId, parent: NodeId) {
        if let Some(weight) = self.graph.node_weight_mut(node.into()) {
            weight.finish(Utc::now());
        }
        self.export(ExportPhase::Exit, node);
        self.rebind(parent);
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
        if let Some(node) = self.node(id) {
            writeln!(f, "{:indent$}{} [{}]", "", node.record(), node.status(), indent = depth * 2)?;
            for child in self.children(id) {
                self.render(f, child, depth + 1)?;
            }
        }
        Ok(())
    }
}

impl Default for TaskTree {
    fn default() -> Self {
        TaskTree::new()
    }
}

impl fmt::Debug for TaskTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskTree")
            .field("nodes", &self.graph.node_count())
            .field("origin", &self.origin)
            .field("cursor", &self.cursor)
            .field("has_exporter", &self.exporter.is_some())
            .finish()
    }
}

/// Renders the tree containing the cursor, one node per line.
impl fmt::Display for TaskTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, self.root(), 0)
    }
}

/// Exit bookkeeping for one call; runs on return, error, and unwind.
struct Frame<'a> {
    tree: &'a mut TaskTree,
    generation: u64,
    node: NodeId,
    parent: NodeId,
}

impl Frame<'_> {
    fn is_live(&self) -> bool {
        self.generation == self.tree.generation
    }
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        if self.is_live() {
            self.tree.exit(self.node, self.parent);
        }
    }
}
