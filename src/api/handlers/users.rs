//! User handlers: list, create, get.

use std::sync::LazyLock;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use regex::Regex;

use super::parse_id;
use crate::api::dto::{CreateUserRequest, UsersResponse};
use crate::app_state::AppState;
use crate::domain::User;
use crate::error::{ApiError, ErrorResponse};

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(email))
}

/// `GET /api/users` — List all users.
///
/// # Errors
///
/// Returns [`ApiError`] on store failure.
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    summary = "List users",
    responses(
        (status = 200, description = "All users", body = UsersResponse),
        (status = 500, description = "Store failure", body = ErrorResponse),
    )
)]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<UsersResponse>, ApiError> {
    let users = state.store.get_users().await?;
    Ok(Json(UsersResponse::from(users)))
}

/// `POST /api/users` — Create a user.
///
/// # Errors
///
/// Returns [`ApiError::BadRequest`] when a field is blank or the email is
/// malformed.
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    summary = "Create a user",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 415, description = "Body is not JSON", body = ErrorResponse),
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let name = req.name.trim();
    let email = req.email.trim();
    let role = req.role.trim();

    if name.is_empty() || email.is_empty() || role.is_empty() {
        return Err(ApiError::BadRequest(
            "name, email, and role are required".to_string(),
        ));
    }
    if !is_valid_email(email) {
        return Err(ApiError::BadRequest("invalid email format".to_string()));
    }

    let user = state.store.create_user(name, email, role).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /api/users/{id}` — Get one user.
///
/// # Errors
///
/// Returns [`ApiError::BadRequest`] for a malformed id and
/// [`ApiError::NotFound`] when the user does not exist.
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    summary = "Get a user",
    params(
        ("id" = i64, Path, description = "User id"),
    ),
    responses(
        (status = 200, description = "User", body = User),
        (status = 400, description = "Invalid user id", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let id = parse_id(&raw_id, "invalid user ID")?;
    state
        .store
        .get_user_by_id(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("user not found"))
}

/// User routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/{id}", get(get_user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("alice@example.com"));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email("alice example@x.com"));
        assert!(!is_valid_email("@example.com"));
    }
}
