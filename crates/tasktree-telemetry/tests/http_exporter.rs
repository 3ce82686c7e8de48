//! HttpExporter against a local axum log service.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::runtime::Handle;

use tasktree_core::{instrument, Arguments, Callable, Signature, TaskTree, TraceExporter};
use tasktree_telemetry::{HttpExporter, TelemetryConfig, TelemetryError};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct LogService {
    received: Arc<Mutex<Vec<Value>>>,
    reply: StatusCode,
}

async fn log(
    State(service): State<LogService>,
    Json(document): Json<Value>,
) -> (StatusCode, String) {
    service.received.lock().push(document);
    let body = if service.reply.is_success() {
        "ok".to_string()
    } else {
        "log store unavailable".to_string()
    };
    (service.reply, body)
}

/// Starts a log service answering `reply` and returns its base URL and the
/// documents it receives.
async fn spawn_log_service(reply: StatusCode) -> (String, Arc<Mutex<Vec<Value>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/neemlog/api/log", post(log))
        .with_state(LogService {
            received: received.clone(),
            reply,
        });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), received)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_send_posts_document() {
    let (base, received) = spawn_log_service(StatusCode::OK).await;
    let exporter = HttpExporter::new(&TelemetryConfig::new(base), Handle::current()).unwrap();

    let document = json!({"call": {"operation": "navigate", "arguments": {}}, "status": "RUNNING"});
    exporter.send(&document).await.unwrap();

    assert_eq!(received.lock().as_slice(), &[document]);
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let (base, _) = spawn_log_service(StatusCode::INTERNAL_SERVER_ERROR).await;
    let exporter = HttpExporter::new(&TelemetryConfig::new(base), Handle::current()).unwrap();

    let err = exporter.send(&json!({})).await.unwrap_err();
    match err {
        TelemetryError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "log store unavailable");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = TelemetryConfig::new(format!("http://{addr}"));
    let exporter = HttpExporter::new(&config, Handle::current()).unwrap();
    let err = exporter.send(&json!({})).await.unwrap_err();
    assert!(matches!(err, TelemetryError::Transport(_)));
}

#[tokio::test]
async fn test_tree_streams_entry_and_exit() {
    let (base, received) = spawn_log_service(StatusCode::OK).await;
    let exporter =
        Arc::new(HttpExporter::new(&TelemetryConfig::new(base), Handle::current()).unwrap());

    let move_torso: Callable<()> =
        instrument("move_torso", Signature::new().param("height"), |_, _| Ok(()));
    let mut tree = TaskTree::new().with_exporter(exporter.clone() as Arc<dyn TraceExporter>);
    move_torso
        .call(&mut tree, Arguments::new().with("height", 0.3))
        .unwrap();
    exporter.flush().await;

    let received = received.lock();
    assert_eq!(received.len(), 2);
    let statuses: Vec<&str> = received
        .iter()
        .map(|doc| doc["status"].as_str().unwrap())
        .collect();
    // Sends run concurrently, so arrival order is not guaranteed.
    assert!(statuses.contains(&"RUNNING"));
    assert!(statuses.contains(&"SUCCEEDED"));
    for doc in received.iter() {
        assert_eq!(doc["call"]["operation"], "move_torso");
        assert_eq!(doc["call"]["arguments"]["height"], 0.3);
    }
}

#[tokio::test]
async fn test_failed_background_send_does_not_fail_call() {
    let (base, received) = spawn_log_service(StatusCode::SERVICE_UNAVAILABLE).await;
    let exporter =
        Arc::new(HttpExporter::new(&TelemetryConfig::new(base), Handle::current()).unwrap());

    let step: Callable<u32> = instrument("step", Signature::new(), |_, _| Ok(7));
    let mut tree = TaskTree::new().with_exporter(exporter.clone());
    assert_eq!(step.call(&mut tree, Arguments::new()).unwrap(), 7);
    exporter.flush().await;

    assert_eq!(received.lock().len(), 2);
}
