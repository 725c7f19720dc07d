//! Database row models and their conversion into domain types.

use chrono::{DateTime, Utc};

use crate::domain::{HistoryField, Task, TaskHistoryItem, TaskStatus, User};
use crate::store::{StoreError, StoreResult};

/// A row from the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    /// Primary key.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Free-text role.
    pub role: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            role: row.role,
        }
    }
}

/// A row from the `tasks` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskRow {
    /// Primary key.
    pub id: i64,
    /// Title.
    pub title: String,
    /// Status wire string.
    pub status: String,
    /// Owning user.
    pub user_id: i64,
}

impl TaskRow {
    /// Parses the stored status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Internal`] if the column holds an unknown value.
    pub fn parsed_status(&self) -> StoreResult<TaskStatus> {
        self.status.parse().map_err(|_| {
            StoreError::Internal(format!(
                "task {} has unknown stored status {:?}",
                self.id, self.status
            ))
        })
    }

    /// Converts into a domain task with the given last change.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Internal`] if the stored status is unknown.
    pub fn into_task(self, last_change: Option<TaskHistoryItem>) -> StoreResult<Task> {
        let status = self.parsed_status()?;
        Ok(Task {
            id: self.id,
            title: self.title,
            status,
            user_id: self.user_id,
            last_change,
        })
    }
}

/// A row from the `task_history` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HistoryRow {
    /// Primary key.
    pub id: i64,
    /// Owning task.
    pub task_id: i64,
    /// Mutation timestamp.
    pub changed_at: DateTime<Utc>,
    /// Actor.
    pub changed_by: String,
    /// Field wire name.
    pub field: String,
    /// Previous value.
    pub from_value: Option<String>,
    /// New value.
    pub to_value: String,
}

impl TryFrom<HistoryRow> for TaskHistoryItem {
    type Error = StoreError;

    fn try_from(row: HistoryRow) -> StoreResult<Self> {
        let field: HistoryField = row.field.parse().map_err(StoreError::Internal)?;
        Ok(Self {
            id: row.id,
            task_id: row.task_id,
            changed_at: row.changed_at,
            changed_by: row.changed_by,
            field,
            from_value: row.from_value,
            to_value: row.to_value,
        })
    }
}

/// A task joined with its newest history entry (`LEFT JOIN LATERAL`).
///
/// The `change_*` columns are all `NULL` when the task has no history.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskWithChangeRow {
    /// Task primary key.
    pub id: i64,
    /// Title.
    pub title: String,
    /// Status wire string.
    pub status: String,
    /// Owning user.
    pub user_id: i64,
    /// History entry id.
    pub change_id: Option<i64>,
    /// History timestamp.
    pub changed_at: Option<DateTime<Utc>>,
    /// History actor.
    pub changed_by: Option<String>,
    /// History field.
    pub field: Option<String>,
    /// History previous value.
    pub from_value: Option<String>,
    /// History new value.
    pub to_value: Option<String>,
}

impl TryFrom<TaskWithChangeRow> for Task {
    type Error = StoreError;

    fn try_from(row: TaskWithChangeRow) -> StoreResult<Self> {
        let last_change = match (row.change_id, row.changed_at, row.field, row.to_value) {
            (Some(id), Some(changed_at), Some(field), Some(to_value)) => {
                Some(TaskHistoryItem::try_from(HistoryRow {
                    id,
                    task_id: row.id,
                    changed_at,
                    changed_by: row.changed_by.unwrap_or_default(),
                    field,
                    from_value: row.from_value,
                    to_value,
                })?)
            }
            _ => None,
        };
        TaskRow {
            id: row.id,
            title: row.title,
            status: row.status,
            user_id: row.user_id,
        }
        .into_task(last_change)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn joined(change_id: Option<i64>) -> TaskWithChangeRow {
        TaskWithChangeRow {
            id: 5,
            title: "Ship".to_string(),
            status: "completed".to_string(),
            user_id: 2,
            change_id,
            changed_at: change_id.map(|_| Utc::now()),
            changed_by: change_id.map(|_| "alice".to_string()),
            field: change_id.map(|_| "status".to_string()),
            from_value: change_id.map(|_| "in-progress".to_string()),
            to_value: change_id.map(|_| "completed".to_string()),
        }
    }

    #[test]
    fn joined_row_with_history_carries_last_change() {
        let Ok(task) = Task::try_from(joined(Some(9))) else {
            panic!("conversion failed");
        };
        let Some(change) = task.last_change else {
            panic!("missing last change");
        };
        assert_eq!(change.id, 9);
        assert_eq!(change.task_id, 5);
        assert_eq!(change.field, HistoryField::Status);
    }

    #[test]
    fn joined_row_without_history_has_no_last_change() {
        let Ok(task) = Task::try_from(joined(None)) else {
            panic!("conversion failed");
        };
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.last_change.is_none());
    }

    #[test]
    fn unknown_stored_status_is_internal_error() {
        let row = TaskRow {
            id: 1,
            title: "T".to_string(),
            status: "archived".to_string(),
            user_id: 1,
        };
        assert!(matches!(row.into_task(None), Err(StoreError::Internal(_))));
    }
}
