//! Health Check API Tests

use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::common::TestApp;

/// Test basic health check endpoint returns 200 OK
#[tokio::test]
async fn test_health_check_returns_ok() {
    let app = TestApp::new();
    let response = app.server().get("/health").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
}

/// Test liveness probe endpoint
#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::new();
    let response = app.server().get("/health/live").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "alive");
}

/// Readiness without a database or broker only reports the connection registry
#[tokio::test]
async fn test_readiness_probe_in_memory() {
    let app = TestApp::new();
    let _alice = app.connect(1);
    let _bob = app.connect(2);

    let response = app.server().get("/health/ready").await;
    response.assert_status_ok();

    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert!(json["checks"].get("database").is_none());
    assert!(json["checks"].get("redis").is_none());
    assert_eq!(json["checks"]["websocket"]["active_connections"], 2);
}

#[tokio::test]
async fn test_metrics_exposed() {
    let app = TestApp::new();
    let _alice = app.connect(1);

    let response = app.server().get("/metrics").await;
    response.assert_status_ok();
    assert!(response
        .text()
        .contains("chat_router_websocket_connections_active"));
}
