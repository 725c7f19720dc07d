//! Fixed initial dataset inserted when storage starts empty.

use crate::domain::{TaskStatus, User};

/// A seed task row with an explicit id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedTask {
    /// Explicit task id.
    pub id: i64,
    /// Title.
    pub title: &'static str,
    /// Initial status.
    pub status: TaskStatus,
    /// Owning user id.
    pub user_id: i64,
}

/// Seed users as `(id, name, email, role)`.
const SEED_USERS: [(i64, &str, &str, &str); 3] = [
    (1, "John Doe", "john@example.com", "developer"),
    (2, "Jane Smith", "jane@example.com", "designer"),
    (3, "Bob Johnson", "bob@example.com", "manager"),
];

/// Seed tasks, each owned by a seed user.
pub const SEED_TASKS: [SeedTask; 3] = [
    SeedTask {
        id: 1,
        title: "Implement authentication",
        status: TaskStatus::Pending,
        user_id: 1,
    },
    SeedTask {
        id: 2,
        title: "Design user interface",
        status: TaskStatus::InProgress,
        user_id: 2,
    },
    SeedTask {
        id: 3,
        title: "Review code changes",
        status: TaskStatus::Completed,
        user_id: 3,
    },
];

/// Returns the seed users.
#[must_use]
pub fn seed_users() -> Vec<User> {
    SEED_USERS
        .iter()
        .map(|&(id, name, email, role)| User {
            id,
            name: name.to_string(),
            email: email.to_string(),
            role: role.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_seed_task_references_a_seed_user() {
        let users = seed_users();
        for task in SEED_TASKS {
            assert!(users.iter().any(|u| u.id == task.user_id));
        }
    }
}
