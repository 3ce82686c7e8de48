//! Core data model and recorder for task trees.
//!
//! A task tree mirrors the nested call structure of an instrumented plan.
//! Every instrumented call becomes a [`TaskTreeNode`] carrying its
//! [`CallRecord`], lifecycle [`TaskStatus`], timestamps, and failure.
//!
//! # Modules
//!
//! - [`id`]: NodeId newtype over the arena index
//! - [`status`]: TaskStatus lifecycle enum
//! - [`error`]: PlanFailure taxonomy, BindError, TaskError
//! - [`argument`]: Argument capability set and the Arguments map
//! - [`code`]: CallRecord, Signature binding, instrumented Callable
//! - [`node`]: TaskTreeNode
//! - [`tree`]: TaskTree context (node arena + cursor) and the call bracketing
//! - [`export`]: TraceExporter seam for entry/exit documents

pub mod argument;
pub mod code;
pub mod error;
pub mod export;
pub mod id;
pub mod node;
pub mod status;
pub mod tree;

// Re-export commonly used types
pub use argument::{Argument, Arguments, JsonArgument};
pub use code::{instrument, CallRecord, Callable, Parameter, Signature};
pub use error::{BindError, FailureKind, PlanFailure, TaskError};
pub use export::{ExportPhase, LogExporter, TraceExporter};
pub use id::NodeId;
pub use node::TaskTreeNode;
pub use status::TaskStatus;
pub use tree::TaskTree;
