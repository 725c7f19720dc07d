//! Append-only audit records for task mutations.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Task attribute a history entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum HistoryField {
    /// The task title.
    #[serde(rename = "title")]
    Title,
    /// The task status.
    #[serde(rename = "status")]
    Status,
    /// The owning user.
    #[serde(rename = "userId")]
    UserId,
}

impl HistoryField {
    /// Order in which an update compares and records fields.
    ///
    /// All entries of one update share a timestamp, so the newest entry of
    /// an update (by `(changed_at, id)`) is the last changed field in this
    /// order.
    pub const UPDATE_ORDER: [Self; 3] = [Self::Title, Self::Status, Self::UserId];

    /// Returns the wire string, also stored in `task_history.field`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Status => "status",
            Self::UserId => "userId",
        }
    }
}

impl fmt::Display for HistoryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::UPDATE_ORDER
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| format!("unknown history field: {s:?}"))
    }
}

/// One immutable before/after record for a single task field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskHistoryItem {
    /// Store-wide monotonically increasing identifier.
    pub id: i64,
    /// Task the entry belongs to.
    pub task_id: i64,
    /// Store-assigned UTC timestamp of the mutation.
    pub changed_at: DateTime<Utc>,
    /// Normalized actor that performed the mutation.
    pub changed_by: String,
    /// Attribute that changed.
    pub field: HistoryField,
    /// Previous value; `None` only for the creation entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_value: Option<String>,
    /// New value, stringified.
    pub to_value: String,
}

/// A history entry that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryEntry {
    /// Task the entry belongs to.
    pub task_id: i64,
    /// Mutation timestamp.
    pub changed_at: DateTime<Utc>,
    /// Normalized actor.
    pub changed_by: String,
    /// Attribute that changed.
    pub field: HistoryField,
    /// Previous value.
    pub from_value: Option<String>,
    /// New value.
    pub to_value: String,
}

impl NewHistoryEntry {
    /// The entry recorded alongside task creation.
    #[must_use]
    pub fn creation(task_id: i64, status: &str, actor: &str, changed_at: DateTime<Utc>) -> Self {
        Self {
            task_id,
            changed_at,
            changed_by: actor.to_string(),
            field: HistoryField::Status,
            from_value: None,
            to_value: status.to_string(),
        }
    }

    /// Attaches the assigned id.
    #[must_use]
    pub fn with_id(self, id: i64) -> TaskHistoryItem {
        TaskHistoryItem {
            id,
            task_id: self.task_id,
            changed_at: self.changed_at,
            changed_by: self.changed_by,
            field: self.field,
            from_value: self.from_value,
            to_value: self.to_value,
        }
    }
}

/// Sort key for newest-first history retrieval.
#[must_use]
pub fn recency_key(item: &TaskHistoryItem) -> (DateTime<Utc>, i64) {
    (item.changed_at, item.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_wire_names_round_trip() {
        for field in HistoryField::UPDATE_ORDER {
            assert_eq!(field.as_str().parse::<HistoryField>(), Ok(field));
        }
        assert!("user_id".parse::<HistoryField>().is_err());
    }

    #[test]
    fn creation_entry_has_no_from_value() {
        let now = Utc::now();
        let item = NewHistoryEntry::creation(4, "pending", "alice", now).with_id(11);
        assert_eq!(item.id, 11);
        assert_eq!(item.field, HistoryField::Status);
        assert_eq!(item.from_value, None);
        assert_eq!(item.to_value, "pending");

        let value = serde_json::to_value(&item).unwrap_or_default();
        assert!(value.get("fromValue").is_none());
        assert_eq!(value["changedBy"], "alice");
        assert_eq!(value["taskId"], 4);
    }

    #[test]
    fn user_id_field_serializes_camel_case() {
        let json = serde_json::to_string(&HistoryField::UserId).unwrap_or_default();
        assert_eq!(json, "\"userId\"");
    }
}
