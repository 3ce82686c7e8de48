//! Telemetry error types.

use thiserror::Error;

/// Errors from delivering a node document to the telemetry endpoint.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The request could not be sent or its response could not be read.
    #[error("telemetry request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("telemetry endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
}
