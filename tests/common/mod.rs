// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{Request, Response};
use sport_tracker::config::Config;
use sport_tracker::db::{DocumentStore, MemoryStore};
use sport_tracker::routes::create_router;
use sport_tracker::services::UserDataService;
use sport_tracker::AppState;
use std::sync::Arc;

/// Create a test app backed by an in-memory store.
/// Returns the router and the store so tests can inspect what was written.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (create_test_app_with_store(store.clone()), store)
}

/// Create a test app on top of any store.
#[allow(dead_code)]
pub fn create_test_app_with_store(store: Arc<dyn DocumentStore>) -> axum::Router {
    let config = Config::test_default();
    let users = UserDataService::new(store, config.retry);

    let state = Arc::new(AppState { config, users });

    create_router(state)
}

/// Build a request with an optional JSON body.
#[allow(dead_code)]
pub fn request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
