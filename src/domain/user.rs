//! User identity record.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// An application user. Users are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// Store-assigned identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Free-text role.
    pub role: String,
}
