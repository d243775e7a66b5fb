// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-only listing of every stored user record.

use crate::models::UserRecord;
use crate::routes::method_not_allowed;
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    let users = get(list_users).fallback(method_not_allowed);

    Router::new()
        .route("/api/users", users.clone())
        .route("/.netlify/functions/get-users", users)
}

/// All user records in stored order.
async fn list_users(State(state): State<Arc<AppState>>) -> Json<Vec<UserRecord>> {
    let users = state.users.list_users().await;
    tracing::debug!(count = users.len(), "Listing users");
    Json(users)
}
