//! HTTP delivery of node documents.
//!
//! [`HttpExporter::send`] posts one document and reports the outcome. As a
//! [`TraceExporter`] it hands each document to a background task on the
//! given runtime, so recording never waits on the network; failures are
//! logged and dropped. [`HttpExporter::flush`] waits for sends in flight.

use parking_lot::Mutex;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use tasktree_core::{ExportPhase, TraceExporter};

use crate::config::TelemetryConfig;
use crate::error::TelemetryError;

pub struct HttpExporter {
    client: reqwest::Client,
    endpoint: String,
    runtime: Handle,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

async fn post_document(
    client: &reqwest::Client,
    endpoint: &str,
    document: &Value,
) -> Result<(), TelemetryError> {
    let response = client
        .post(endpoint)
        .header("Content-Type", "application/json")
        .json(document)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await?;
        return Err(TelemetryError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(())
}

impl HttpExporter {
    /// Builds an exporter posting to `config.endpoint()`. Background sends
    /// are spawned on `runtime`.
    pub fn new(config: &TelemetryConfig, runtime: Handle) -> Result<Self, TelemetryError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(HttpExporter {
            client,
            endpoint: config.endpoint(),
            runtime,
            pending: Mutex::new(Vec::new()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Posts one document, without retry.
    pub async fn send(&self, document: &Value) -> Result<(), TelemetryError> {
        post_document(&self.client, &self.endpoint, document).await
    }

    /// Waits for every background send started so far.
    pub async fn flush(&self) {
        let handles = std::mem::take(&mut *self.pending.lock());
        for handle in handles {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "telemetry send task failed");
            }
        }
    }
}

impl TraceExporter for HttpExporter {
    fn export(&self, phase: ExportPhase, document: &Value) {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let document = document.clone();
        let handle = self.runtime.spawn(async move {
            if let Err(err) = post_document(&client, &endpoint, &document).await {
                tracing::warn!(?phase, error = %err, "failed to send task tree node");
            }
        });

        let mut pending = self.pending.lock();
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }
}
