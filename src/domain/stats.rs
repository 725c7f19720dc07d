//! Aggregate counts over users and tasks.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::TaskStatus;

/// Snapshot of user and task counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Stats {
    /// User totals.
    pub users: UserStats,
    /// Task totals by status.
    pub tasks: TaskStats,
}

/// User totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserStats {
    /// Number of users.
    pub total: i64,
}

/// Task totals, overall and per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    /// Number of tasks.
    pub total: i64,
    /// Tasks in `pending`.
    pub pending: i64,
    /// Tasks in `in-progress`.
    pub in_progress: i64,
    /// Tasks in `completed`.
    pub completed: i64,
}

impl TaskStats {
    /// Counts one task with the given status.
    pub fn record(&mut self, status: TaskStatus) {
        self.total += 1;
        match status {
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::InProgress => self.in_progress += 1,
            TaskStatus::Completed => self.completed += 1,
        }
    }
}
