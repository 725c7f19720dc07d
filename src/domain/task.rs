//! Task entity, its status enum, and the partial-update descriptor.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::history::TaskHistoryItem;

/// Lifecycle status of a task.
///
/// Only these three values are valid. The wire form is the kebab-case
/// string (`"in-progress"`, not `"InProgress"`), which is also the value
/// stored in the `tasks.status` column and recorded in history entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Not started yet.
    Pending,
    /// Being worked on.
    InProgress,
    /// Done.
    Completed,
}

impl TaskStatus {
    /// Every valid status, in display order.
    pub const ALL: [Self; 3] = [Self::Pending, Self::InProgress, Self::Completed];

    /// Returns the wire string for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the three task statuses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid task status: {0:?}")]
pub struct InvalidStatus(pub String);

impl FromStr for TaskStatus {
    type Err = InvalidStatus;

    /// Exact, case-sensitive match against the wire strings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| InvalidStatus(s.to_string()))
    }
}

/// A work item assigned to a user.
///
/// `last_change` is a read-time projection of the newest history entry
/// for this task. It is never stored alongside the task itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Store-assigned identifier.
    pub id: i64,
    /// Non-empty title.
    pub title: String,
    /// Current status.
    pub status: TaskStatus,
    /// Owning user. Always resolves to an existing user.
    pub user_id: i64,
    /// Most recent history entry, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_change: Option<TaskHistoryItem>,
}

/// Partial update for a task.
///
/// `None` leaves the field unchanged. `status` is carried as the raw
/// string so that the store validates it before touching any state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    /// New title.
    pub title: Option<String>,
    /// New status, not yet validated.
    pub status: Option<String>,
    /// New owning user.
    pub user_id: Option<i64>,
}

impl TaskUpdate {
    /// Returns `true` when no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.status.is_none() && self.user_id.is_none()
    }

    /// Parses the requested status, if any.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidStatus`] when a status is present but not one of
    /// the three allowed values.
    pub fn parsed_status(&self) -> Result<Option<TaskStatus>, InvalidStatus> {
        self.status.as_deref().map(str::parse).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_valid_status() {
        for status in TaskStatus::ALL {
            assert_eq!(status.as_str().parse::<TaskStatus>(), Ok(status));
        }
    }

    #[test]
    fn rejects_unknown_and_miscased_status() {
        for raw in ["bogus", "", "Pending", " pending", "in_progress"] {
            assert_eq!(
                raw.parse::<TaskStatus>(),
                Err(InvalidStatus(raw.to_string()))
            );
        }
    }

    #[test]
    fn status_serializes_as_kebab_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap_or_default();
        assert_eq!(json, "\"in-progress\"");
    }

    #[test]
    fn task_omits_missing_last_change() {
        let task = Task {
            id: 7,
            title: "Write docs".to_string(),
            status: TaskStatus::Pending,
            user_id: 2,
            last_change: None,
        };
        let value = serde_json::to_value(&task).unwrap_or_default();
        assert_eq!(value["userId"], 2);
        assert!(value.get("lastChange").is_none());
    }

    #[test]
    fn empty_update_is_detected() {
        assert!(TaskUpdate::default().is_empty());
        let update = TaskUpdate {
            user_id: Some(3),
            ..TaskUpdate::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn parsed_status_validates_only_when_present() {
        assert_eq!(TaskUpdate::default().parsed_status(), Ok(None));
        let update = TaskUpdate {
            status: Some("completed".to_string()),
            ..TaskUpdate::default()
        };
        assert_eq!(update.parsed_status(), Ok(Some(TaskStatus::Completed)));
        let bad = TaskUpdate {
            status: Some("done".to_string()),
            ..TaskUpdate::default()
        };
        assert!(bad.parsed_status().is_err());
    }
}
