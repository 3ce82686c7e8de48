//! Delivery of task tree node documents to a remote log service.
//!
//! [`HttpExporter`] posts each document as JSON to
//! `{base_url}/neemlog/api/log` and implements
//! [`TraceExporter`](tasktree_core::TraceExporter) so a
//! [`TaskTree`](tasktree_core::TaskTree) can stream nodes as calls enter and
//! exit.

pub mod config;
pub mod error;
pub mod http;

pub use config::TelemetryConfig;
pub use error::TelemetryError;
pub use http::HttpExporter;
