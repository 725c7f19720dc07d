//! System endpoints: health check and aggregate stats.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::domain::Stats;
use crate::error::{ApiError, ErrorResponse};

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: &'static str,
    message: &'static str,
    version: &'static str,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            message: "taskboard backend is running",
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// `GET /api/stats` — User and task counts.
///
/// # Errors
///
/// Returns [`ApiError`] on store failure.
#[utoipa::path(
    get,
    path = "/api/stats",
    tag = "System",
    summary = "Aggregate counts",
    description = "Total users, total tasks, and tasks per status.",
    responses(
        (status = 200, description = "Current counts", body = Stats),
        (status = 500, description = "Store failure", body = ErrorResponse),
    )
)]
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<Stats>, ApiError> {
    Ok(Json(state.store.get_stats().await?))
}

/// System routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/stats", get(stats_handler))
}
