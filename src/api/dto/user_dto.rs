//! User DTOs for create and list operations.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::User;

/// Request body for `POST /api/users`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    /// Display name (required, trimmed).
    #[serde(default)]
    pub name: String,
    /// Email address (required, trimmed).
    #[serde(default)]
    pub email: String,
    /// Role (required, trimmed).
    #[serde(default)]
    pub role: String,
}

/// Response body for `GET /api/users`.
#[derive(Debug, Serialize, ToSchema)]
pub struct UsersResponse {
    /// All users ordered by id.
    pub users: Vec<User>,
    /// Number of users returned.
    pub count: usize,
}

impl From<Vec<User>> for UsersResponse {
    fn from(users: Vec<User>) -> Self {
        Self {
            count: users.len(),
            users,
        }
    }
}
