//! Telemetry endpoint configuration.
//!
//! Read from the environment:
//! - `TASKTREE_TELEMETRY_URL`: base URL of the log service (default: "http://localhost:5000")
//! - `TASKTREE_TELEMETRY_TIMEOUT_MS`: request timeout in milliseconds (default: 5000)

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Path the node documents are posted to, relative to the base URL.
pub const LOG_PATH: &str = "/neemlog/api/log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl TelemetryConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        TelemetryConfig {
            base_url: base_url.into(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    pub fn from_env() -> Self {
        let base_url = std::env::var("TASKTREE_TELEMETRY_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout_ms = std::env::var("TASKTREE_TELEMETRY_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        TelemetryConfig {
            base_url,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Full URL of the log endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), LOG_PATH)
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        TelemetryConfig::new(DEFAULT_BASE_URL)
    }
}
