//! Integration tests for `GET /result/{task_id}`.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{body_json, get, post_payload};
use taskrelay_core::result::ResultRecord;
use taskrelay_core::types::TaskId;
use taskrelay_store::ResultWriter;

async fn submit(app: axum::Router, route: &str, payload: &str) -> String {
    let response = post_payload(app, route, payload).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    body_json(response).await["task_id"]
        .as_str()
        .unwrap()
        .to_string()
}

// ---------------------------------------------------------------------------
// Test: a freshly submitted task reads as pending
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submitted_task_is_pending() {
    let (app, _store) = common::build_test_app();
    let task_id = submit(app.clone(), "/task1", "hello").await;

    let response = get(app, &format!("/result/{task_id}")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "pending");
    assert!(json.get("result").is_none());
}

#[tokio::test]
async fn unknown_id_is_pending() {
    let (app, _store) = common::build_test_app();
    let response = get(app, &format!("/result/{}", TaskId::generate())).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "pending");
}

// ---------------------------------------------------------------------------
// Test: terminal records are returned unchanged on every read
// ---------------------------------------------------------------------------

#[tokio::test]
async fn done_result_is_stable_across_reads() {
    let (app, store) = common::build_test_app();
    let task_id = submit(app.clone(), "/task1", "hello").await;
    let id: TaskId = task_id.parse().unwrap();

    let writer = ResultWriter::new(store, Duration::from_secs(60));
    writer.record(&ResultRecord::done(id, "olleh")).await.unwrap();

    let uri = format!("/result/{task_id}");
    let first = body_json(get(app.clone(), &uri).await).await;
    assert_eq!(first["status"], "done");
    assert_eq!(first["result"], "olleh");

    for _ in 0..3 {
        assert_eq!(body_json(get(app.clone(), &uri).await).await, first);
    }
}

#[tokio::test]
async fn error_result_carries_message() {
    let (app, store) = common::build_test_app();
    let id = TaskId::generate();

    let writer = ResultWriter::new(store, Duration::from_secs(60));
    writer
        .record(&ResultRecord::error(id, "payload rejected"))
        .await
        .unwrap();

    let json = body_json(get(app, &format!("/result/{id}")).await).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"], "payload rejected");
}

// ---------------------------------------------------------------------------
// Test: error paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_id_returns_400() {
    let (app, _store) = common::build_test_app();
    let response = get(app, "/result/not-a-uuid").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn store_outage_returns_503() {
    let (app, store) = common::build_test_app();
    store.set_offline(true);

    let response = get(app, &format!("/result/{}", TaskId::generate())).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "RESULT_STORE_UNAVAILABLE");
}
