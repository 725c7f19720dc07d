//! Domain layer: entities and pure validators.
//!
//! This module holds the user, task, and task-history types shared by
//! both store implementations and the HTTP layer, plus the actor
//! normalization and status validation rules.

pub mod actor;
pub mod history;
pub mod stats;
pub mod task;
pub mod user;

pub use actor::{DEFAULT_ACTOR, normalize_actor};
pub use history::{HistoryField, NewHistoryEntry, TaskHistoryItem};
pub use stats::{Stats, TaskStats, UserStats};
pub use task::{InvalidStatus, Task, TaskStatus, TaskUpdate};
pub use user::User;
