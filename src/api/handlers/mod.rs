//! REST endpoint handlers organized by resource.

pub mod system;
pub mod tasks;
pub mod users;

use axum::Router;
use axum::http::HeaderMap;

use crate::app_state::AppState;
use crate::domain::normalize_actor;
use crate::error::ApiError;

/// Header carrying the actor recorded in task history.
pub const ACTOR_HEADER: &str = "x-actor";

/// Composes all resource routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(system::routes())
        .merge(users::routes())
        .merge(tasks::routes())
}

/// Parses a positive integer id from a path segment or query value.
fn parse_id(raw: &str, message: &'static str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::BadRequest(message.to_string()))
}

/// Reads and normalizes the `X-Actor` header.
fn actor_from_headers(headers: &HeaderMap) -> String {
    let raw = headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    normalize_actor(raw)
}
