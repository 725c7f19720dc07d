//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Resource routes live under `/api`; the health check is at `/health`.
//! With the `swagger-ui` feature the OpenAPI document is served at
//! `/api-docs/openapi.json` and browsable at `/swagger-ui`.

pub mod dto;
pub mod handlers;

use std::any::Any;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use tower_http::catch_panic::CatchPanicLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::error::{ApiError, ErrorResponse};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1 << 20;

/// OpenAPI description of every endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "taskboard-backend", description = "Users, tasks, and per-field task history"),
    paths(
        handlers::system::health_handler,
        handlers::system::stats_handler,
        handlers::users::list_users,
        handlers::users::create_user,
        handlers::users::get_user,
        handlers::tasks::list_tasks,
        handlers::tasks::create_task,
        handlers::tasks::update_task,
        handlers::tasks::task_history,
    ),
    components(schemas(
        crate::domain::User,
        crate::domain::Task,
        crate::domain::TaskStatus,
        crate::domain::TaskHistoryItem,
        crate::domain::HistoryField,
        crate::domain::Stats,
        crate::error::ErrorResponse,
        dto::CreateUserRequest,
        dto::UsersResponse,
        dto::CreateTaskRequest,
        dto::UpdateTaskRequest,
        dto::TasksResponse,
        dto::TaskHistoryResponse,
    )),
    tags(
        (name = "System", description = "Health and aggregate counts"),
        (name = "Users", description = "User management"),
        (name = "Tasks", description = "Task mutation and audit history"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
///
/// Wrong methods on known paths and handler panics both answer with the
/// JSON error body.
pub fn build_router() -> Router<AppState> {
    with_docs(handlers::routes())
        .method_not_allowed_fallback(method_not_allowed)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CatchPanicLayer::custom(panic_response))
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Converts a handler panic into a logged 500 with a generic message.
fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    tracing::error!(panic = detail, "handler panicked");
    let body = ErrorResponse {
        error: "internal server error".to_string(),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

#[cfg(feature = "swagger-ui")]
fn with_docs(router: Router<AppState>) -> Router<AppState> {
    router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
}

#[cfg(not(feature = "swagger-ui"))]
fn with_docs(router: Router<AppState>) -> Router<AppState> {
    router
}
