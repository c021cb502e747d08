#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use taskrelay_api::config::ServerConfig;
use taskrelay_api::router::build_app_router;
use taskrelay_api::state::AppState;
use taskrelay_store::InMemoryStore;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        redis_url: "redis://unused".to_string(),
        key_prefix: "test".to_string(),
        max_payload_chars: 100,
        service_name: "api-test".to_string(),
    }
}

/// Build the full application router over an in-memory store.
///
/// The store is returned so tests can inspect the queue, write results as
/// a worker would, or simulate an outage.
pub fn build_test_app() -> (Router, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let state = AppState::new(store.clone(), test_config());
    let app = build_app_router(state).expect("test config is valid");
    (app, store)
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST `body` with the given content type and extra headers.
pub async fn post(
    app: Router,
    uri: &str,
    content_type: &str,
    body: &str,
    headers: &[(&str, &str)],
) -> Response {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", content_type);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a JSON-string payload.
pub async fn post_payload(app: Router, uri: &str, payload: &str) -> Response {
    let body = serde_json::to_string(payload).unwrap();
    post(app, uri, "application/json", &body, &[]).await
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
