//! Integration tests for the health check endpoint and general HTTP behaviour.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, get};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Test: GET /health returns 200 with expected JSON fields
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_ok_with_json() {
    let (app, _store) = common::build_test_app();
    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["store_healthy"], true);
}

// ---------------------------------------------------------------------------
// Test: store outage reports degraded, still 200
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_reports_degraded_store() {
    let (app, store) = common::build_test_app();
    store.set_offline(true);

    let response = get(app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["store_healthy"], false);
}

// ---------------------------------------------------------------------------
// Test: Unknown route returns 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let (app, _store) = common::build_test_app();
    let response = get(app, "/task4").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: x-request-id header is assigned and echoed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_contains_generated_request_id() {
    let (app, _store) = common::build_test_app();
    let response = get(app, "/health").await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("Response must contain an x-request-id header");
    assert_eq!(request_id.to_str().unwrap().len(), 36);
}

#[tokio::test]
async fn client_request_id_is_preserved() {
    let (app, _store) = common::build_test_app();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "client-supplied")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "client-supplied");
}

// ---------------------------------------------------------------------------
// Test: CORS preflight allows trace propagation headers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cors_preflight_allows_traceparent() {
    let (app, _store) = common::build_test_app();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/task1")
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type,traceparent")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(
        headers["access-control-allow-origin"],
        "http://localhost:5173"
    );
    let allowed = headers["access-control-allow-headers"].to_str().unwrap();
    assert!(allowed.contains("traceparent"), "allowed headers: {allowed}");
}

// ---------------------------------------------------------------------------
// Test: GET /metrics/live reports queue depth
// ---------------------------------------------------------------------------

#[tokio::test]
async fn live_metrics_report_queue_depth() {
    let (app, _store) = common::build_test_app();

    for payload in ["a", "b"] {
        let response = common::post_payload(app.clone(), "/task1", payload).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    let response = get(app, "/metrics/live").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["metrics"]["task_queue_depth"], 2);
    assert_eq!(json["metrics"]["status"], "live");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn live_metrics_unavailable_queue_returns_503() {
    let (app, store) = common::build_test_app();
    store.set_offline(true);

    let response = get(app, "/metrics/live").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "QUEUE_UNAVAILABLE");
}
