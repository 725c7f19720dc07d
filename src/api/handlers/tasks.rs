//! Task handlers: list, create, partial update, history.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};

use super::{actor_from_headers, parse_id};
use crate::api::dto::{
    CreateTaskRequest, TaskHistoryResponse, TaskListParams, TasksResponse, UpdateTaskRequest,
};
use crate::app_state::AppState;
use crate::domain::{Task, TaskStatus, TaskUpdate};
use crate::error::{ApiError, ErrorResponse};

fn validate_status(raw: &str) -> Result<String, ApiError> {
    let status = raw.trim();
    status
        .parse::<TaskStatus>()
        .map(|_| status.to_string())
        .map_err(|_| ApiError::BadRequest("invalid status".to_string()))
}

/// `GET /api/tasks` — List tasks, optionally filtered.
///
/// # Errors
///
/// Returns [`ApiError::BadRequest`] when `userId` is not a positive
/// integer.
#[utoipa::path(
    get,
    path = "/api/tasks",
    tag = "Tasks",
    summary = "List tasks",
    description = "Returns tasks matching both filters, each with its most recent history entry.",
    params(TaskListParams),
    responses(
        (status = 200, description = "Matching tasks", body = TasksResponse),
        (status = 400, description = "Invalid userId", body = ErrorResponse),
    )
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(params): Query<TaskListParams>,
) -> Result<Json<TasksResponse>, ApiError> {
    let status = params.status.unwrap_or_default();
    let user_id = params.user_id.unwrap_or_default();
    if !user_id.is_empty() {
        parse_id(&user_id, "invalid userId query parameter")?;
    }

    let tasks = state.store.get_tasks(&status, &user_id).await?;
    Ok(Json(TasksResponse::from(tasks)))
}

/// `POST /api/tasks` — Create a task.
///
/// The `X-Actor` header names the actor recorded in history.
///
/// # Errors
///
/// Returns [`ApiError::BadRequest`] for missing fields, an invalid
/// status, or an unknown user.
#[utoipa::path(
    post,
    path = "/api/tasks",
    tag = "Tasks",
    summary = "Create a task",
    request_body = CreateTaskRequest,
    params(
        ("X-Actor" = Option<String>, Header, description = "Actor recorded in history"),
    ),
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 400, description = "Invalid request or unknown user", body = ErrorResponse),
        (status = 415, description = "Body is not JSON", body = ErrorResponse),
    )
)]
pub async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let title = req.title.trim();
    let status = req.status.trim();

    let Some(user_id) = req.user_id.filter(|_| !title.is_empty() && !status.is_empty()) else {
        return Err(ApiError::BadRequest(
            "title, status, and userId are required".to_string(),
        ));
    };
    let status = validate_status(status)?;

    let task = state
        .store
        .create_task(title, &status, user_id, &actor_from_headers(&headers))
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// `PUT /api/tasks/{id}` — Partially update a task.
///
/// Only fields whose value actually changes are recorded in history.
///
/// # Errors
///
/// Returns [`ApiError::BadRequest`] for an empty body, blank title,
/// invalid status, or unknown user, and 404 when the task does not exist.
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    summary = "Update a task",
    request_body = UpdateTaskRequest,
    params(
        ("id" = i64, Path, description = "Task id"),
        ("X-Actor" = Option<String>, Header, description = "Actor recorded in history"),
    ),
    responses(
        (status = 200, description = "Updated task", body = Task),
        (status = 400, description = "Invalid request or unknown user", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse),
    )
)]
pub async fn update_task(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_id(&raw_id, "invalid task ID")?;
    let Json(req) = payload?;

    let mut update = TaskUpdate {
        user_id: req.user_id,
        ..TaskUpdate::default()
    };
    if let Some(title) = req.title {
        let title = title.trim();
        if title.is_empty() {
            return Err(ApiError::BadRequest("title cannot be empty".to_string()));
        }
        update.title = Some(title.to_string());
    }
    if let Some(status) = req.status {
        update.status = Some(validate_status(&status)?);
    }
    if update.is_empty() {
        return Err(ApiError::BadRequest(
            "at least one field must be provided".to_string(),
        ));
    }

    let task = state
        .store
        .update_task(id, update, &actor_from_headers(&headers))
        .await?;
    Ok(Json(task))
}

/// `GET /api/tasks/{id}/history` — Audit trail, newest first.
///
/// # Errors
///
/// Returns [`ApiError::BadRequest`] for a malformed id and 404 when the
/// task does not exist.
#[utoipa::path(
    get,
    path = "/api/tasks/{id}/history",
    tag = "Tasks",
    summary = "Task history",
    params(
        ("id" = i64, Path, description = "Task id"),
    ),
    responses(
        (status = 200, description = "History entries", body = TaskHistoryResponse),
        (status = 400, description = "Invalid task id", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse),
    )
)]
pub async fn task_history(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<TaskHistoryResponse>, ApiError> {
    let task_id = parse_id(&raw_id, "invalid task ID")?;
    let history = state.store.get_task_history(task_id).await?;
    Ok(Json(TaskHistoryResponse {
        task_id,
        count: history.len(),
        history,
    }))
}

/// Task routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/{id}", put(update_task))
        .route("/api/tasks/{id}/history", get(task_history))
}
