//! Health Check API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use crate::common::{json_body, text_body, TestApp};

/// Test basic health check endpoint returns 200 OK
#[tokio::test]
async fn test_health_check_returns_ok() {
    // Arrange
    let app = TestApp::new();

    // Act
    let response = app.get("/health").await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

/// Liveness never depends on the gateway
#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::new();

    let response = app.get("/health/live").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "alive");
}

#[tokio::test]
async fn test_readiness_reports_gateway_counts() {
    // Arrange
    let app = TestApp::new();
    let _alice = app.login(1, "alice").await;
    let _anonymous = app.connect();

    // Act
    let response = app.get("/health/ready").await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    let gateway = &json["checks"]["gateway"];
    assert_eq!(gateway["status"], "healthy");
    assert_eq!(gateway["active_connections"], 2);
    assert_eq!(gateway["authenticated_connections"], 1);
    assert_eq!(gateway["online_users"], 1);
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_gateway_gauges() {
    let app = TestApp::new();
    let _alice = app.login(1, "alice").await;

    let response = app.get("/metrics").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = text_body(response).await;
    assert!(body.contains("huddle_gateway_connections_active"));
    assert!(body.contains("huddle_gateway_events_total"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::new();

    let response = app.get("/api/v1/nothing-here").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
