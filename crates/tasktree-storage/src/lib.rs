//! Storage for recorded task trees.
//!
//! Provides the [`TaskStore`] trait that all backends implement, the
//! [`InMemoryStore`] and [`SqliteStore`] backends, and [`persist`], which
//! writes a subtree of a live [`TaskTree`](tasktree_core::TaskTree) into a
//! store.
//!
//! # Modules
//!
//! - [`error`]: StorageError with all failure modes
//! - [`types`]: row ids, row types and process metadata
//! - [`traits`]: TaskStore trait definition
//! - [`persist`]: subtree persistence with progress reporting
//! - [`memory`]: InMemoryStore implementation
//! - [`schema`]: migration setup for SQLite
//! - [`sqlite`]: SqliteStore implementation

pub mod error;
pub mod memory;
pub mod persist;
pub mod schema;
pub mod sqlite;
pub mod traits;
pub mod types;

pub use error::StorageError;
pub use memory::InMemoryStore;
pub use persist::{persist, PersistOptions, PersistProgress};
pub use sqlite::SqliteStore;
pub use traits::TaskStore;
pub use types::{
    CodeId, CodeRow, DesignatorId, DesignatorRow, MetadataId, NodeRow, PersistedId,
    ProcessMetadata, StoredCode, StoredNode,
};
