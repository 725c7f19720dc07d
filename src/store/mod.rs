//! Store layer: the persistence contract and its two implementations.
//!
//! [`TaskStore`] is the only interface the HTTP handlers depend on.
//! [`InMemoryStore`] is the reference implementation guarded by a single
//! lock; [`PostgresStore`] is the durable implementation built on
//! `sqlx::PgPool` transactions with row-level locking. Both must behave
//! identically for every operation.

pub mod memory;
pub mod postgres;
pub mod seed;

use async_trait::async_trait;

use crate::domain::{InvalidStatus, Stats, Task, TaskHistoryItem, TaskUpdate, User};

pub use memory::InMemoryStore;
pub use postgres::{PostgresSettings, PostgresStore};

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by store implementations.
///
/// The first three variants are stable domain conditions the HTTP layer
/// maps to distinct status codes. The rest are opaque infrastructure
/// failures carrying the name of the step that failed.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No task with the given id exists.
    #[error("task not found: {0}")]
    TaskNotFound(i64),

    /// A status outside `pending`, `in-progress`, `completed` was supplied.
    #[error("invalid task status: {0:?}")]
    InvalidTaskStatus(String),

    /// The referenced user does not exist.
    #[error("user does not exist: {0}")]
    UserDoesNotExist(i64),

    /// A database statement failed.
    #[error("{context}: {source}")]
    Database {
        /// Step that failed, e.g. `"insert task history"`.
        context: &'static str,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },

    /// The operation exceeded its time budget and was abandoned.
    #[error("{context}: timed out after {timeout_ms} ms")]
    Timeout {
        /// Operation that timed out.
        context: &'static str,
        /// Budget that was exceeded.
        timeout_ms: u128,
    },

    /// Stored data violated an invariant the schema should have enforced.
    #[error("internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Returns a mapper wrapping a [`sqlx::Error`] with the failing step.
    pub fn database(context: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| Self::Database { context, source }
    }

    /// Returns `true` for failures that are not domain conditions.
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::Database { .. } | Self::Timeout { .. } | Self::Internal(_)
        )
    }
}

impl From<InvalidStatus> for StoreError {
    fn from(err: InvalidStatus) -> Self {
        Self::InvalidTaskStatus(err.0)
    }
}

/// Persistence contract for users, tasks, and task history.
///
/// Every mutation of a task is recorded as one history entry per field
/// whose value actually changed. Implementations own all state; returned
/// values are independent copies.
#[async_trait]
pub trait TaskStore: Send + Sync + std::fmt::Debug {
    /// Returns all users ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an infrastructure [`StoreError`] on backend failure.
    async fn get_users(&self) -> StoreResult<Vec<User>>;

    /// Looks up a single user. `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an infrastructure [`StoreError`] on backend failure.
    async fn get_user_by_id(&self, id: i64) -> StoreResult<Option<User>>;

    /// Returns tasks matching both filters, ordered by id.
    ///
    /// An empty filter places no constraint. A `user_id_filter` that does
    /// not parse as an integer matches nothing. Each task carries its
    /// newest history entry as `last_change`.
    ///
    /// # Errors
    ///
    /// Returns an infrastructure [`StoreError`] on backend failure.
    async fn get_tasks(&self, status_filter: &str, user_id_filter: &str)
    -> StoreResult<Vec<Task>>;

    /// Returns the full history of a task, newest first (ties broken by
    /// descending entry id).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TaskNotFound`] when the task does not exist.
    async fn get_task_history(&self, task_id: i64) -> StoreResult<Vec<TaskHistoryItem>>;

    /// Returns user and task counts.
    ///
    /// # Errors
    ///
    /// Returns an infrastructure [`StoreError`] on backend failure.
    async fn get_stats(&self) -> StoreResult<Stats>;

    /// Creates a user with the next id.
    ///
    /// # Errors
    ///
    /// Returns an infrastructure [`StoreError`] on backend failure.
    async fn create_user(&self, name: &str, email: &str, role: &str) -> StoreResult<User>;

    /// Creates a task and, atomically with it, its `status` creation entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidTaskStatus`] before any mutation when
    /// `status` is invalid, and [`StoreError::UserDoesNotExist`] when
    /// `user_id` does not resolve.
    async fn create_task(
        &self,
        title: &str,
        status: &str,
        user_id: i64,
        actor: &str,
    ) -> StoreResult<Task>;

    /// Applies a partial update, recording one history entry per field
    /// whose value changed, in [`crate::domain::HistoryField::UPDATE_ORDER`].
    ///
    /// The returned task's `last_change` is the newest entry recorded by
    /// this call, or the task's previous newest entry when nothing changed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidTaskStatus`], [`StoreError::TaskNotFound`],
    /// or [`StoreError::UserDoesNotExist`]; no state changes in any of
    /// these cases.
    async fn update_task(&self, id: i64, update: TaskUpdate, actor: &str) -> StoreResult<Task>;
}

/// Interprets the user filter of [`TaskStore::get_tasks`].
///
/// `Ok(None)` means no constraint, `Err(())` means the filter cannot match
/// anything.
pub(crate) fn parse_user_filter(raw: &str) -> Result<Option<i64>, ()> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i64>().map(Some).map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_filter_parsing() {
        assert_eq!(parse_user_filter(""), Ok(None));
        assert_eq!(parse_user_filter("2"), Ok(Some(2)));
        assert_eq!(parse_user_filter("not-an-int"), Err(()));
        assert_eq!(parse_user_filter(" 2"), Err(()));
    }

    #[test]
    fn invalid_status_converts_to_store_error() {
        let err = StoreError::from(InvalidStatus("bogus".to_string()));
        assert!(matches!(err, StoreError::InvalidTaskStatus(ref s) if s == "bogus"));
        assert!(!err.is_infrastructure());
    }

    #[test]
    fn timeout_is_infrastructure() {
        let err = StoreError::Timeout {
            context: "update task",
            timeout_ms: 3000,
        };
        assert!(err.is_infrastructure());
        assert_eq!(err.to_string(), "update task: timed out after 3000 ms");
    }
}
