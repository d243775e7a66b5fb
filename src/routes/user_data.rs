// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User data endpoint: leaderboard, single-user lookup, save and delete.
//!
//! Mounted at `/api/user-data` and at the path the hosted frontend already
//! calls (`/.netlify/functions/user-data`).

use crate::error::{AppError, Result};
use crate::models::{LeaderboardEntry, UserRecord};
use crate::routes::method_not_allowed;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// User data routes.
pub fn routes() -> Router<Arc<AppState>> {
    let user_data: MethodRouter<Arc<AppState>> = get(get_user_data)
        .post(save_user)
        .delete(delete_user)
        .fallback(method_not_allowed);

    Router::new()
        .route("/api/user-data", user_data.clone())
        .route("/.netlify/functions/user-data", user_data)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct UsernameQuery {
    pub username: Option<String>,
}

impl UsernameQuery {
    /// The query username, treating an empty value as absent.
    fn username(&self) -> Option<&str> {
        self.username.as_deref().filter(|u| !u.is_empty())
    }
}

/// Acknowledgement for successful writes.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SuccessResponse {
    pub success: bool,
}

// ─── Read ────────────────────────────────────────────────────

/// `GET` without a username returns the leaderboard; with one, that user's
/// record or `null`.
async fn get_user_data(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UsernameQuery>,
) -> Response {
    match query.username() {
        Some(username) => {
            tracing::debug!(username, "Fetching user data");
            let user: Option<UserRecord> = state.users.get_user(username).await;
            Json(user).into_response()
        }
        None => {
            tracing::debug!("Fetching leaderboard");
            let leaderboard: Vec<LeaderboardEntry> = state.users.leaderboard().await;
            Json(leaderboard).into_response()
        }
    }
}

// ─── Write ───────────────────────────────────────────────────

/// Create or replace a user's record with the request body.
async fn save_user(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UsernameQuery>,
    body: Bytes,
) -> Result<Json<SuccessResponse>> {
    let mut fields = parse_object_body(&body)?;

    // Username comes from the body, falling back to the query string
    let body_username = fields
        .get("username")
        .and_then(Value::as_str)
        .filter(|u| !u.is_empty())
        .map(str::to_string);
    let username = body_username
        .or_else(|| query.username().map(str::to_string))
        .ok_or_else(|| AppError::BadRequest("Username required".to_string()))?;
    fields.insert("username".to_string(), Value::String(username));

    let record: UserRecord = serde_json::from_value(Value::Object(fields))
        .map_err(|e| AppError::BadRequest(format!("Invalid user record: {}", e)))?;
    record
        .validate()
        .map_err(|e| AppError::BadRequest(format!("Invalid user record: {}", e)))?;

    tracing::info!(username = %record.username, "Saving user");
    let outcome = state.users.save_user(record).await?;
    tracing::debug!(outcome = ?outcome, "User saved");

    Ok(Json(SuccessResponse { success: true }))
}

/// Remove a user's record. Succeeds whether or not the user existed.
async fn delete_user(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UsernameQuery>,
    body: Bytes,
) -> Result<Json<SuccessResponse>> {
    // The body is optional here; an unreadable one is ignored
    let body_username = parse_object_body(&body).ok().and_then(|fields| {
        fields
            .get("username")
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
    });
    let username = body_username
        .or_else(|| query.username().map(str::to_string))
        .ok_or_else(|| AppError::BadRequest("Username required".to_string()))?;

    tracing::info!(username = %username, "Deleting user");
    let outcome = state.users.delete_user(&username).await?;
    tracing::debug!(outcome = ?outcome, "User delete handled");

    Ok(Json(SuccessResponse { success: true }))
}

/// Parse a JSON object body. An empty body is an empty object.
fn parse_object_body(body: &[u8]) -> Result<Map<String, Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(AppError::BadRequest(
            "Request body must be a JSON object".to_string(),
        )),
        Err(e) => {
            tracing::warn!(error = %e, bytes = body.len(), "Invalid JSON received");
            Err(AppError::BadRequest("Invalid JSON body".to_string()))
        }
    }
}
