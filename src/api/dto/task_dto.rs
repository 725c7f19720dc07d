//! Task DTOs for create, update, list, and history operations.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{Task, TaskHistoryItem};

/// Request body for `POST /api/tasks`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateTaskRequest {
    /// Title (required, trimmed).
    #[serde(default)]
    pub title: String,
    /// Initial status (required, trimmed).
    #[serde(default)]
    pub status: String,
    /// Owning user (required).
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// Request body for `PUT /api/tasks/{id}`.
///
/// Absent and `null` fields are left unchanged; at least one field must
/// be present.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    /// New title.
    #[serde(default)]
    pub title: Option<String>,
    /// New status.
    #[serde(default)]
    pub status: Option<String>,
    /// New owning user.
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// Query parameters for `GET /api/tasks`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TaskListParams {
    /// Only tasks with this status.
    pub status: Option<String>,
    /// Only tasks owned by this user (positive integer).
    pub user_id: Option<String>,
}

/// Response body for `GET /api/tasks`.
#[derive(Debug, Serialize, ToSchema)]
pub struct TasksResponse {
    /// Matching tasks ordered by id.
    pub tasks: Vec<Task>,
    /// Number of tasks returned.
    pub count: usize,
}

impl From<Vec<Task>> for TasksResponse {
    fn from(tasks: Vec<Task>) -> Self {
        Self {
            count: tasks.len(),
            tasks,
        }
    }
}

/// Response body for `GET /api/tasks/{id}/history`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskHistoryResponse {
    /// Task the history belongs to.
    pub task_id: i64,
    /// Entries, newest first.
    pub history: Vec<TaskHistoryItem>,
    /// Number of entries.
    pub count: usize,
}
