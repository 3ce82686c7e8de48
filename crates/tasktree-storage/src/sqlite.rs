//! SQLite implementation of [`TaskStore`].
//!
//! [`SqliteStore`] writes one row per transaction. Timestamps are stored as
//! RFC 3339 TEXT, statuses by name and designator documents as JSON TEXT.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use tasktree_core::TaskStatus;

use crate::error::StorageError;
use crate::traits::TaskStore;
use crate::types::{
    CodeId, CodeRow, DesignatorId, DesignatorRow, MetadataId, NodeRow, PersistedId,
    ProcessMetadata, StoredCode, StoredNode,
};

const NODE_COLUMNS: &str =
    "id, code_id, parent_id, start_time, end_time, status, reason, metadata_id";

/// SQLite-backed implementation of [`TaskStore`].
pub struct SqliteStore {
    conn: Connection,
}

/// A node row as read, before timestamp and status parsing.
struct RawNode {
    id: i64,
    code_id: i64,
    parent_id: Option<i64>,
    start_time: Option<String>,
    end_time: Option<String>,
    status: String,
    reason: Option<String>,
    metadata_id: i64,
}

impl RawNode {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(RawNode {
            id: row.get(0)?,
            code_id: row.get(1)?,
            parent_id: row.get(2)?,
            start_time: row.get(3)?,
            end_time: row.get(4)?,
            status: row.get(5)?,
            reason: row.get(6)?,
            metadata_id: row.get(7)?,
        })
    }

    fn into_stored(self) -> Result<StoredNode, StorageError> {
        Ok(StoredNode {
            id: PersistedId(self.id),
            code_id: CodeId(self.code_id),
            parent_id: self.parent_id.map(PersistedId),
            start_time: self.start_time.as_deref().map(parse_time).transpose()?,
            end_time: self.end_time.as_deref().map(parse_time).transpose()?,
            status: TaskStatus::from_name(&self.status)
                .ok_or(StorageError::InvalidStatus(self.status))?,
            reason: self.reason,
            metadata_id: MetadataId(self.metadata_id),
        })
    }
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339()
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

impl SqliteStore {
    /// Opens (or creates) a database at `path`.
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = crate::schema::open_database(path)?;
        Ok(SqliteStore { conn })
    }

    /// Opens an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteStore { conn })
    }

    fn exists(&self, table: &str, id: i64) -> Result<bool, StorageError> {
        let exists = self.conn.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)"),
            params![id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn assert_metadata_exists(&self, id: MetadataId) -> Result<(), StorageError> {
        if !self.exists("process_metadata", id.0)? {
            return Err(StorageError::MetadataNotFound(id.0));
        }
        Ok(())
    }
}

impl TaskStore for SqliteStore {
    fn insert_metadata(&mut self, metadata: &ProcessMetadata) -> Result<MetadataId, StorageError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO process_metadata (created_at, created_by, description, version) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                format_time(&metadata.created_at),
                metadata.created_by,
                metadata.description,
                metadata.version
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(MetadataId(id))
    }

    fn insert_designator(&mut self, row: &DesignatorRow) -> Result<DesignatorId, StorageError> {
        self.assert_metadata_exists(row.metadata_id)?;
        let document_json = serde_json::to_string(&row.document)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO designators (designator_type, document_json, metadata_id) \
             VALUES (?1, ?2, ?3)",
            params![row.designator_type, document_json, row.metadata_id.0],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(DesignatorId(id))
    }

    fn insert_code(&mut self, row: &CodeRow) -> Result<CodeId, StorageError> {
        self.assert_metadata_exists(row.metadata_id)?;
        if let Some(designator) = row.designator_id {
            if !self.exists("designators", designator.0)? {
                return Err(StorageError::DesignatorNotFound(designator.0));
            }
        }
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO code (function, designator_id, metadata_id) VALUES (?1, ?2, ?3)",
            params![row.function, row.designator_id.map(|d| d.0), row.metadata_id.0],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(CodeId(id))
    }

    fn insert_node(
        &mut self,
        row: &NodeRow,
        code: CodeId,
        parent: Option<PersistedId>,
    ) -> Result<PersistedId, StorageError> {
        self.assert_metadata_exists(row.metadata_id)?;
        if !self.exists("code", code.0)? {
            return Err(StorageError::CodeNotFound(code.0));
        }
        if let Some(parent) = parent {
            if !self.exists("task_tree_nodes", parent.0)? {
                return Err(StorageError::NodeNotFound(parent.0));
            }
        }
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO task_tree_nodes \
             (code_id, parent_id, start_time, end_time, status, reason, metadata_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                code.0,
                parent.map(|p| p.0),
                row.start_time.as_ref().map(format_time),
                row.end_time.as_ref().map(format_time),
                row.status.name(),
                row.reason,
                row.metadata_id.0
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(PersistedId(id))
    }

    fn get_metadata(&self, id: MetadataId) -> Result<ProcessMetadata, StorageError> {
        let row: Option<(String, String, String, String)> = self
            .conn
            .query_row(
                "SELECT created_at, created_by, description, version \
                 FROM process_metadata WHERE id = ?1",
                params![id.0],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        match row {
            Some((created_at, created_by, description, version)) => Ok(ProcessMetadata {
                created_at: parse_time(&created_at)?,
                created_by,
                description,
                version,
            }),
            None => Err(StorageError::MetadataNotFound(id.0)),
        }
    }

    fn get_designator(&self, id: DesignatorId) -> Result<DesignatorRow, StorageError> {
        let row: Option<(String, String, i64)> = self
            .conn
            .query_row(
                "SELECT designator_type, document_json, metadata_id FROM designators WHERE id = ?1",
                params![id.0],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        match row {
            Some((designator_type, document_json, metadata_id)) => Ok(DesignatorRow {
                designator_type,
                document: serde_json::from_str(&document_json)?,
                metadata_id: MetadataId(metadata_id),
            }),
            None => Err(StorageError::DesignatorNotFound(id.0)),
        }
    }

    fn get_code(&self, id: CodeId) -> Result<StoredCode, StorageError> {
        self.conn
            .query_row(
                "SELECT function, designator_id, metadata_id FROM code WHERE id = ?1",
                params![id.0],
                |row| {
                    Ok(StoredCode {
                        id,
                        function: row.get(0)?,
                        designator_id: row.get::<_, Option<i64>>(1)?.map(DesignatorId),
                        metadata_id: MetadataId(row.get(2)?),
                    })
                },
            )
            .optional()?
            .ok_or(StorageError::CodeNotFound(id.0))
    }

    fn get_node(&self, id: PersistedId) -> Result<StoredNode, StorageError> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {NODE_COLUMNS} FROM task_tree_nodes WHERE id = ?1"),
                params![id.0],
                RawNode::from_row,
            )
            .optional()?;

        match raw {
            Some(raw) => raw.into_stored(),
            None => Err(StorageError::NodeNotFound(id.0)),
        }
    }

    fn children_of(&self, parent: Option<PersistedId>) -> Result<Vec<StoredNode>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NODE_COLUMNS} FROM task_tree_nodes WHERE parent_id IS ?1 ORDER BY id"
        ))?;
        let raw = stmt
            .query_map(params![parent.map(|p| p.0)], RawNode::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(RawNode::into_stored).collect()
    }

    fn count_nodes(&self) -> Result<usize, StorageError> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM task_tree_nodes", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
