//! In-memory reference implementation of [`TaskStore`].
//!
//! All state lives behind one [`tokio::sync::RwLock`]. Reads take the
//! shared lock and return clones; every mutation holds the exclusive lock
//! across its existence checks, writes, and history appends, so each
//! operation is atomic relative to every other one.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::seed::{SEED_TASKS, seed_users};
use super::{StoreError, StoreResult, TaskStore, parse_user_filter};
use crate::domain::history::recency_key;
use crate::domain::{
    DEFAULT_ACTOR, HistoryField, NewHistoryEntry, Stats, Task, TaskHistoryItem, TaskStatus,
    TaskUpdate, User, normalize_actor,
};

/// Thread-safe in-memory store.
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

/// Stored task columns. `last_change` is derived from the history log.
#[derive(Debug, Clone)]
struct TaskRecord {
    id: i64,
    title: String,
    status: TaskStatus,
    user_id: i64,
}

#[derive(Debug)]
struct MemoryState {
    users: Vec<User>,
    tasks: Vec<TaskRecord>,
    history: HashMap<i64, Vec<TaskHistoryItem>>,
    next_user_id: i64,
    next_task_id: i64,
    next_history_id: i64,
}

impl InMemoryStore {
    /// Builds a store from explicit fixtures.
    ///
    /// Each given task receives one synthesized `status` creation entry
    /// attributed to [`DEFAULT_ACTOR`], so every task has a history from
    /// the start. Id counters continue after the largest given id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Internal`] for duplicate user or task ids and
    /// [`StoreError::UserDoesNotExist`] when a task's owner is not among
    /// `users`.
    pub fn new(users: Vec<User>, tasks: Vec<Task>) -> StoreResult<Self> {
        let mut user_ids = HashSet::with_capacity(users.len());
        if let Some(dup) = users.iter().find(|u| !user_ids.insert(u.id)) {
            return Err(StoreError::Internal(format!("duplicate user id {}", dup.id)));
        }
        let mut task_ids = HashSet::with_capacity(tasks.len());
        for task in &tasks {
            if !task_ids.insert(task.id) {
                return Err(StoreError::Internal(format!("duplicate task id {}", task.id)));
            }
            if !user_ids.contains(&task.user_id) {
                return Err(StoreError::UserDoesNotExist(task.user_id));
            }
        }
        Ok(Self::from_fixtures(users, tasks))
    }

    /// Builds the state without validating the fixtures.
    fn from_fixtures(users: Vec<User>, tasks: Vec<Task>) -> Self {
        let now = Utc::now();
        let mut state = MemoryState {
            next_user_id: users.iter().map(|u| u.id).max().unwrap_or(0) + 1,
            next_task_id: tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1,
            next_history_id: 1,
            users,
            tasks: Vec::with_capacity(tasks.len()),
            history: HashMap::with_capacity(tasks.len()),
        };
        for task in tasks {
            state.append_history(NewHistoryEntry::creation(
                task.id,
                task.status.as_str(),
                DEFAULT_ACTOR,
                now,
            ));
            state.tasks.push(TaskRecord {
                id: task.id,
                title: task.title,
                status: task.status,
                user_id: task.user_id,
            });
        }
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Builds a store holding the standard seed users and tasks.
    #[must_use]
    pub fn seeded() -> Self {
        let tasks = SEED_TASKS
            .iter()
            .map(|seed| Task {
                id: seed.id,
                title: seed.title.to_string(),
                status: seed.status,
                user_id: seed.user_id,
                last_change: None,
            })
            .collect();
        Self::from_fixtures(seed_users(), tasks)
    }

    /// Builds an empty store.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_fixtures(Vec::new(), Vec::new())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::seeded()
    }
}

impl MemoryState {
    fn user_exists(&self, id: i64) -> bool {
        self.users.iter().any(|u| u.id == id)
    }

    fn task_index(&self, id: i64) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    fn latest_change(&self, task_id: i64) -> Option<TaskHistoryItem> {
        self.history
            .get(&task_id)?
            .iter()
            .max_by_key(|item| recency_key(item))
            .cloned()
    }

    fn project(&self, record: &TaskRecord) -> Task {
        Task {
            id: record.id,
            title: record.title.clone(),
            status: record.status,
            user_id: record.user_id,
            last_change: self.latest_change(record.id),
        }
    }

    fn append_history(&mut self, entry: NewHistoryEntry) -> TaskHistoryItem {
        let item = entry.with_id(self.next_history_id);
        self.next_history_id += 1;
        self.history
            .entry(item.task_id)
            .or_default()
            .push(item.clone());
        item
    }
}

#[async_trait]
impl TaskStore for InMemoryStore {
    async fn get_users(&self) -> StoreResult<Vec<User>> {
        let state = self.state.read().await;
        let mut users = state.users.clone();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn get_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_tasks(
        &self,
        status_filter: &str,
        user_id_filter: &str,
    ) -> StoreResult<Vec<Task>> {
        let Ok(user_id) = parse_user_filter(user_id_filter) else {
            return Ok(Vec::new());
        };

        let state = self.state.read().await;
        let mut tasks: Vec<Task> = state
            .tasks
            .iter()
            .filter(|t| status_filter.is_empty() || t.status.as_str() == status_filter)
            .filter(|t| user_id.is_none_or(|uid| t.user_id == uid))
            .map(|t| state.project(t))
            .collect();
        tasks.sort_by_key(|t| t.id);
        Ok(tasks)
    }

    async fn get_task_history(&self, task_id: i64) -> StoreResult<Vec<TaskHistoryItem>> {
        let state = self.state.read().await;
        if state.task_index(task_id).is_none() {
            return Err(StoreError::TaskNotFound(task_id));
        }

        let mut history = state.history.get(&task_id).cloned().unwrap_or_default();
        history.sort_by_key(|item| std::cmp::Reverse(recency_key(item)));
        Ok(history)
    }

    async fn get_stats(&self) -> StoreResult<Stats> {
        let state = self.state.read().await;
        let mut stats = Stats::default();
        stats.users.total = i64::try_from(state.users.len())
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        for task in &state.tasks {
            stats.tasks.record(task.status);
        }
        Ok(stats)
    }

    async fn create_user(&self, name: &str, email: &str, role: &str) -> StoreResult<User> {
        let mut state = self.state.write().await;
        let user = User {
            id: state.next_user_id,
            name: name.to_string(),
            email: email.to_string(),
            role: role.to_string(),
        };
        state.next_user_id += 1;
        state.users.push(user.clone());

        tracing::info!(user_id = user.id, "user created");
        Ok(user)
    }

    async fn create_task(
        &self,
        title: &str,
        status: &str,
        user_id: i64,
        actor: &str,
    ) -> StoreResult<Task> {
        let status: TaskStatus = status.parse()?;
        let actor = normalize_actor(actor);

        let mut state = self.state.write().await;
        if !state.user_exists(user_id) {
            return Err(StoreError::UserDoesNotExist(user_id));
        }

        let record = TaskRecord {
            id: state.next_task_id,
            title: title.to_string(),
            status,
            user_id,
        };
        state.next_task_id += 1;
        let change = state.append_history(NewHistoryEntry::creation(
            record.id,
            status.as_str(),
            &actor,
            Utc::now(),
        ));
        state.tasks.push(record.clone());

        tracing::info!(task_id = record.id, user_id, %actor, "task created");
        Ok(Task {
            id: record.id,
            title: record.title,
            status: record.status,
            user_id: record.user_id,
            last_change: Some(change),
        })
    }

    async fn update_task(&self, id: i64, update: TaskUpdate, actor: &str) -> StoreResult<Task> {
        let new_status = update.parsed_status()?;
        let actor = normalize_actor(actor);

        let mut state = self.state.write().await;
        let idx = state.task_index(id).ok_or(StoreError::TaskNotFound(id))?;
        if let Some(user_id) = update.user_id
            && !state.user_exists(user_id)
        {
            return Err(StoreError::UserDoesNotExist(user_id));
        }

        let Some(current) = state.tasks.get(idx).cloned() else {
            return Err(StoreError::TaskNotFound(id));
        };
        let mut next = current.clone();
        let now = Utc::now();
        let mut pending = Vec::new();

        for field in HistoryField::UPDATE_ORDER {
            let change = match field {
                HistoryField::Title => update
                    .title
                    .as_ref()
                    .filter(|title| **title != current.title)
                    .map(|title| {
                        next.title.clone_from(title);
                        (current.title.clone(), title.clone())
                    }),
                HistoryField::Status => new_status
                    .filter(|status| *status != current.status)
                    .map(|status| {
                        next.status = status;
                        (current.status.to_string(), status.to_string())
                    }),
                HistoryField::UserId => update
                    .user_id
                    .filter(|user_id| *user_id != current.user_id)
                    .map(|user_id| {
                        next.user_id = user_id;
                        (current.user_id.to_string(), user_id.to_string())
                    }),
            };
            if let Some((from, to)) = change {
                pending.push(NewHistoryEntry {
                    task_id: id,
                    changed_at: now,
                    changed_by: actor.clone(),
                    field,
                    from_value: Some(from),
                    to_value: to,
                });
            }
        }

        let changed = pending.len();
        let mut latest = None;
        for entry in pending {
            latest = Some(state.append_history(entry));
        }
        if let Some(slot) = state.tasks.get_mut(idx) {
            *slot = next.clone();
        }

        tracing::info!(task_id = id, changed, %actor, "task updated");
        let mut task = state.project(&next);
        if latest.is_some() {
            task.last_change = latest;
        }
        Ok(task)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_tasks_start_with_one_history_entry() {
        let store = InMemoryStore::seeded();
        for seed in SEED_TASKS {
            let Ok(history) = store.get_task_history(seed.id).await else {
                panic!("seed task {} missing", seed.id);
            };
            assert_eq!(history.len(), 1);
            let Some(entry) = history.first() else {
                panic!("empty history");
            };
            assert_eq!(entry.changed_by, DEFAULT_ACTOR);
            assert_eq!(entry.from_value, None);
            assert_eq!(entry.to_value, seed.status.as_str());
        }
    }

    #[tokio::test]
    async fn counters_continue_after_fixture_ids() {
        let store = InMemoryStore::seeded();
        let Ok(user) = store.create_user("Alice", "alice@example.com", "dev").await else {
            panic!("create user failed");
        };
        assert_eq!(user.id, 4);

        let Ok(task) = store.create_task("New", "pending", user.id, "").await else {
            panic!("create task failed");
        };
        assert_eq!(task.id, 4);
        let Some(change) = task.last_change else {
            panic!("missing last change");
        };
        assert_eq!(change.id, 4);
        assert_eq!(change.changed_by, "system");
    }

    #[tokio::test]
    async fn returned_values_are_independent_copies() {
        let store = InMemoryStore::seeded();
        let Ok(mut users) = store.get_users().await else {
            panic!("get users failed");
        };
        if let Some(first) = users.first_mut() {
            first.name = "Mutated".to_string();
        }
        let Ok(Some(user)) = store.get_user_by_id(1).await else {
            panic!("user 1 missing");
        };
        assert_eq!(user.name, "John Doe");

        let Ok(mut history) = store.get_task_history(1).await else {
            panic!("history failed");
        };
        if let Some(first) = history.first_mut() {
            first.to_value = "tampered".to_string();
        }
        let Ok(history) = store.get_task_history(1).await else {
            panic!("history failed");
        };
        assert_eq!(
            history.first().map(|h| h.to_value.as_str()),
            Some("pending")
        );
    }

    #[tokio::test]
    async fn redundant_fields_still_apply_other_changes() {
        let store = InMemoryStore::seeded();
        let update = TaskUpdate {
            title: Some("Implement authentication".to_string()),
            status: Some("in-progress".to_string()),
            user_id: Some(1),
        };
        let Ok(task) = store.update_task(1, update, "bob").await else {
            panic!("update failed");
        };
        assert_eq!(task.status, TaskStatus::InProgress);
        let Some(change) = task.last_change else {
            panic!("missing last change");
        };
        assert_eq!(change.field, HistoryField::Status);
        assert_eq!(change.from_value.as_deref(), Some("pending"));

        let Ok(history) = store.get_task_history(1).await else {
            panic!("history failed");
        };
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn failed_update_leaves_task_untouched() {
        let store = InMemoryStore::seeded();
        let update = TaskUpdate {
            title: Some("Changed".to_string()),
            user_id: Some(99),
            ..TaskUpdate::default()
        };
        let result = store.update_task(1, update, "bob").await;
        assert!(matches!(result, Err(StoreError::UserDoesNotExist(99))));

        let Ok(tasks) = store.get_tasks("", "1").await else {
            panic!("get tasks failed");
        };
        assert_eq!(
            tasks.first().map(|t| t.title.as_str()),
            Some("Implement authentication")
        );
        let Ok(history) = store.get_task_history(1).await else {
            panic!("history failed");
        };
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn user_id_change_is_stringified() {
        let store = InMemoryStore::seeded();
        let update = TaskUpdate {
            user_id: Some(3),
            ..TaskUpdate::default()
        };
        let Ok(task) = store.update_task(2, update, "").await else {
            panic!("update failed");
        };
        let Some(change) = task.last_change else {
            panic!("missing last change");
        };
        assert_eq!(change.field, HistoryField::UserId);
        assert_eq!(change.from_value.as_deref(), Some("2"));
        assert_eq!(change.to_value, "3");
        assert_eq!(change.changed_by, "system");
    }

    #[tokio::test]
    async fn empty_store_has_no_users_or_tasks() {
        let store = InMemoryStore::empty();
        let Ok(stats) = store.get_stats().await else {
            panic!("stats failed");
        };
        assert_eq!(stats, Stats::default());
        let result = store.create_task("T", "pending", 1, "a").await;
        assert!(matches!(result, Err(StoreError::UserDoesNotExist(1))));
    }

    #[tokio::test]
    async fn update_returns_appended_entry_after_clock_step_back() {
        let store = InMemoryStore::seeded();
        {
            let mut state = store.state.write().await;
            let Some(entries) = state.history.get_mut(&1) else {
                panic!("task 1 has no history");
            };
            for entry in entries.iter_mut() {
                entry.changed_at += chrono::Duration::hours(1);
            }
        }

        let update = TaskUpdate {
            title: Some("Renamed".to_string()),
            ..TaskUpdate::default()
        };
        let Ok(task) = store.update_task(1, update, "bob").await else {
            panic!("update failed");
        };
        let Some(change) = task.last_change else {
            panic!("missing last change");
        };
        assert_eq!(change.field, HistoryField::Title);
        assert_eq!(change.to_value, "Renamed");
        assert_eq!(change.changed_by, "bob");
    }

    fn fixture_user(id: i64) -> User {
        User {
            id,
            name: format!("User {id}"),
            email: format!("user{id}@example.com"),
            role: "dev".to_string(),
        }
    }

    fn fixture_task(id: i64, user_id: i64) -> Task {
        Task {
            id,
            title: format!("Task {id}"),
            status: TaskStatus::Pending,
            user_id,
            last_change: None,
        }
    }

    #[tokio::test]
    async fn fixtures_are_validated() {
        let orphan = InMemoryStore::new(vec![fixture_user(1)], vec![fixture_task(1, 7)]);
        assert!(matches!(orphan, Err(StoreError::UserDoesNotExist(7))));

        let duplicate_tasks = InMemoryStore::new(
            vec![fixture_user(1)],
            vec![fixture_task(1, 1), fixture_task(1, 1)],
        );
        assert!(matches!(duplicate_tasks, Err(StoreError::Internal(_))));

        let duplicate_users =
            InMemoryStore::new(vec![fixture_user(2), fixture_user(2)], Vec::new());
        assert!(matches!(duplicate_users, Err(StoreError::Internal(_))));

        let Ok(store) = InMemoryStore::new(
            vec![fixture_user(1), fixture_user(5)],
            vec![fixture_task(3, 5)],
        ) else {
            panic!("valid fixtures rejected");
        };
        let Ok(history) = store.get_task_history(3).await else {
            panic!("fixture task missing");
        };
        assert_eq!(history.len(), 1);
        let Ok(user) = store.create_user("N", "n@example.com", "dev").await else {
            panic!("create user failed");
        };
        assert_eq!(user.id, 6);
    }
}
