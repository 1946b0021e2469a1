//! Health Check API Tests

use axum::http::StatusCode;
use tokio::sync::mpsc;

use wayzer_relay::presentation::websocket::ConnectionId;

use crate::common::TestApp;

#[tokio::test]
async fn test_health_check_reports_connections() {
    let app = TestApp::new();
    let (tx, _rx) = mpsc::unbounded_channel();
    app.state.registry.register(1, ConnectionId::new(), tx.clone());
    app.state.registry.register(1, ConnectionId::new(), tx);

    let response = app.server().get("/health").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connections"], 2);
    assert_eq!(body["online_users"], 1);
}

#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::new();
    let response = app.server().get("/health/live").await;

    response.assert_status_ok();
    response.assert_json(&serde_json::json!({ "status": "alive" }));
}

#[tokio::test]
async fn test_readiness_without_backends_is_healthy() {
    let app = TestApp::new();
    let response = app.server().get("/health/ready").await;

    response.assert_status(StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["database"]["status"], "disabled");
    assert_eq!(body["checks"]["redis"]["status"], "disabled");
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_relay_metrics() {
    let app = TestApp::new();
    let response = app.server().get("/metrics").await;

    response.assert_status_ok();
    assert!(response.text().contains("wayzer_relay_dead_connections_evicted_total"));
}
