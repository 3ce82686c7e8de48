//! Export seam for node documents.
//!
//! The recorder hands the serialized node to a [`TraceExporter`] when a call
//! enters and again when it exits. Exporters must not fail the call: any
//! transport problem is theirs to log.

use serde_json::Value;

/// When a document is exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportPhase {
    /// After the node is linked and running.
    Entry,
    /// After the final status and end time are set.
    Exit,
}

/// Receives node documents from the recorder.
pub trait TraceExporter: Send + Sync {
    fn export(&self, phase: ExportPhase, document: &Value);
}

/// Writes documents to the `tracing` log at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogExporter;

impl TraceExporter for LogExporter {
    fn export(&self, phase: ExportPhase, document: &Value) {
        tracing::debug!(?phase, %document, "task tree node");
    }
}
