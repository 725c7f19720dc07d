//! PostgreSQL implementation of [`TaskStore`].
//!
//! Mutations run inside one `sqlx` transaction each. `update_task` loads
//! the task row `FOR UPDATE`, so concurrent updates to the same task
//! serialize while different tasks proceed independently. Every public
//! operation is bounded by a fixed timeout; a transaction abandoned by a
//! timeout or an error is rolled back when it is dropped.

pub mod rows;
pub mod schema;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool};

use self::rows::{HistoryRow, TaskRow, TaskWithChangeRow, UserRow};
use super::{StoreError, StoreResult, TaskStore, parse_user_filter};
use crate::domain::{
    HistoryField, NewHistoryEntry, Stats, Task, TaskHistoryItem, TaskStatus, TaskUpdate, User,
    normalize_actor,
};

const HISTORY_COLUMNS: &str =
    "id, task_id, changed_at, changed_by, field, from_value, to_value";

/// Connection and timing settings for [`PostgresStore::connect`].
#[derive(Debug, Clone)]
pub struct PostgresSettings {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Maximum pool size.
    pub max_connections: u32,
    /// Idle connections kept open.
    pub min_connections: u32,
    /// Timeout for acquiring a connection and for each startup ping.
    pub connect_timeout: Duration,
    /// Budget for every store operation.
    pub operation_timeout: Duration,
    /// Startup ping attempts before giving up.
    pub ping_retries: u32,
    /// Fixed delay between startup ping attempts.
    pub ping_backoff: Duration,
}

impl PostgresSettings {
    /// Settings with defaults for everything except the URL.
    #[must_use]
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 20,
            min_connections: 0,
            connect_timeout: Duration::from_secs(3),
            operation_timeout: Duration::from_secs(3),
            ping_retries: 20,
            ping_backoff: Duration::from_secs(1),
        }
    }
}

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    operation_timeout: Duration,
}

impl PostgresStore {
    /// Opens the pool, waits for the database, ensures the schema, and
    /// seeds empty tables.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the URL is blank, the database
    /// never answers a ping, or schema/seed statements fail.
    pub async fn connect(settings: &PostgresSettings) -> StoreResult<Self> {
        if settings.database_url.trim().is_empty() {
            return Err(StoreError::Database {
                context: "open postgres connection",
                source: sqlx::Error::Configuration("database url is required".into()),
            });
        }

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(settings.connect_timeout)
            .idle_timeout(Duration::from_secs(5 * 60))
            .max_lifetime(Duration::from_secs(30 * 60))
            .connect_lazy(&settings.database_url)
            .map_err(StoreError::database("open postgres connection"))?;

        let store = Self::from_pool(pool, settings.operation_timeout);
        if let Err(err) = store.bootstrap(settings).await {
            store.pool.close().await;
            return Err(err);
        }
        Ok(store)
    }

    /// Wraps an existing pool without running any bootstrap step.
    #[must_use]
    pub const fn from_pool(pool: PgPool, operation_timeout: Duration) -> Self {
        Self {
            pool,
            operation_timeout,
        }
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn bootstrap(&self, settings: &PostgresSettings) -> StoreResult<()> {
        self.ping_with_retry(settings).await?;
        self.bounded("initialize schema", schema::init_schema(&self.pool))
            .await?;
        self.bounded("seed initial data", schema::seed_initial_data(&self.pool))
            .await?;
        tracing::info!("postgres store ready");
        Ok(())
    }

    /// Pings until the database answers, sleeping a fixed backoff between
    /// attempts.
    async fn ping_with_retry(&self, settings: &PostgresSettings) -> StoreResult<()> {
        let attempts = settings.ping_retries.max(1);
        let mut last_err = None;
        for attempt in 1..=attempts {
            let ping = sqlx::query("SELECT 1").execute(&self.pool);
            match tokio::time::timeout(settings.connect_timeout, ping).await {
                Ok(Ok(_)) => {
                    tracing::debug!(attempt, "database ping succeeded");
                    return Ok(());
                }
                Ok(Err(err)) => {
                    tracing::warn!(attempt, attempts, error = %err, "database ping failed");
                    last_err = Some(err);
                }
                Err(_) => {
                    tracing::warn!(attempt, attempts, "database ping timed out");
                    last_err = Some(sqlx::Error::PoolTimedOut);
                }
            }
            if attempt < attempts {
                tokio::time::sleep(settings.ping_backoff).await;
            }
        }
        Err(StoreError::Database {
            context: "ping postgres",
            source: last_err.unwrap_or(sqlx::Error::PoolTimedOut),
        })
    }

    /// Runs `op` under the operation timeout.
    async fn bounded<T, F>(&self, context: &'static str, op: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match tokio::time::timeout(self.operation_timeout, op).await {
            Ok(result) => {
                if let Err(err) = &result
                    && err.is_infrastructure()
                {
                    tracing::error!(operation = context, error = %err, "store operation failed");
                }
                result
            }
            Err(_) => {
                tracing::error!(operation = context, "store operation timed out");
                Err(StoreError::Timeout {
                    context,
                    timeout_ms: self.operation_timeout.as_millis(),
                })
            }
        }
    }
}

async fn ensure_user_exists(conn: &mut PgConnection, user_id: i64) -> StoreResult<()> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(user_id)
        .fetch_one(conn)
        .await
        .map_err(StoreError::database("check user existence"))?;
    if exists {
        Ok(())
    } else {
        Err(StoreError::UserDoesNotExist(user_id))
    }
}

/// Inserts one history row, returning it with the id and timestamp the
/// database stored.
async fn insert_history(
    conn: &mut PgConnection,
    entry: NewHistoryEntry,
) -> StoreResult<TaskHistoryItem> {
    let row: HistoryRow = sqlx::query_as(&format!(
        "INSERT INTO task_history (task_id, changed_at, changed_by, field, from_value, to_value) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {HISTORY_COLUMNS}"
    ))
    .bind(entry.task_id)
    .bind(entry.changed_at)
    .bind(&entry.changed_by)
    .bind(entry.field.as_str())
    .bind(entry.from_value.as_deref())
    .bind(&entry.to_value)
    .fetch_one(conn)
    .await
    .map_err(StoreError::database("insert task history"))?;
    TaskHistoryItem::try_from(row)
}

async fn latest_history(
    conn: &mut PgConnection,
    task_id: i64,
) -> StoreResult<Option<TaskHistoryItem>> {
    let row: Option<HistoryRow> = sqlx::query_as(&format!(
        "SELECT {HISTORY_COLUMNS} FROM task_history WHERE task_id = $1 \
         ORDER BY changed_at DESC, id DESC LIMIT 1"
    ))
    .bind(task_id)
    .fetch_optional(conn)
    .await
    .map_err(StoreError::database("query latest task history"))?;
    row.map(TaskHistoryItem::try_from).transpose()
}

#[async_trait]
impl TaskStore for PostgresStore {
    async fn get_users(&self) -> StoreResult<Vec<User>> {
        self.bounded("get users", async {
            let rows: Vec<UserRow> =
                sqlx::query_as("SELECT id, name, email, role FROM users ORDER BY id")
                    .fetch_all(&self.pool)
                    .await
                    .map_err(StoreError::database("query users"))?;
            Ok(rows.into_iter().map(User::from).collect())
        })
        .await
    }

    async fn get_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        self.bounded("get user", async {
            let row: Option<UserRow> =
                sqlx::query_as("SELECT id, name, email, role FROM users WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(StoreError::database("query user by id"))?;
            Ok(row.map(User::from))
        })
        .await
    }

    async fn get_tasks(
        &self,
        status_filter: &str,
        user_id_filter: &str,
    ) -> StoreResult<Vec<Task>> {
        let Ok(user_id) = parse_user_filter(user_id_filter) else {
            return Ok(Vec::new());
        };
        let status = (!status_filter.is_empty()).then_some(status_filter);

        self.bounded("get tasks", async {
            let rows: Vec<TaskWithChangeRow> = sqlx::query_as(
                "SELECT t.id, t.title, t.status, t.user_id, \
                        h.id AS change_id, h.changed_at, h.changed_by, h.field, \
                        h.from_value, h.to_value \
                 FROM tasks t \
                 LEFT JOIN LATERAL ( \
                     SELECT id, changed_at, changed_by, field, from_value, to_value \
                     FROM task_history \
                     WHERE task_id = t.id \
                     ORDER BY changed_at DESC, id DESC \
                     LIMIT 1 \
                 ) h ON true \
                 WHERE ($1::text IS NULL OR t.status = $1) \
                   AND ($2::bigint IS NULL OR t.user_id = $2) \
                 ORDER BY t.id",
            )
            .bind(status)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::database("query tasks"))?;
            rows.into_iter().map(Task::try_from).collect()
        })
        .await
    }

    async fn get_task_history(&self, task_id: i64) -> StoreResult<Vec<TaskHistoryItem>> {
        self.bounded("get task history", async {
            let exists =
                sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM tasks WHERE id = $1)")
                    .bind(task_id)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(StoreError::database("check task existence"))?;
            if !exists {
                return Err(StoreError::TaskNotFound(task_id));
            }

            let rows: Vec<HistoryRow> = sqlx::query_as(&format!(
                "SELECT {HISTORY_COLUMNS} FROM task_history WHERE task_id = $1 \
                 ORDER BY changed_at DESC, id DESC"
            ))
            .bind(task_id)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::database("query task history"))?;
            rows.into_iter().map(TaskHistoryItem::try_from).collect()
        })
        .await
    }

    async fn get_stats(&self) -> StoreResult<Stats> {
        self.bounded("get stats", async {
            let mut stats = Stats::default();
            stats.users.total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
                .fetch_one(&self.pool)
                .await
                .map_err(StoreError::database("query user stats"))?;

            let (total, pending, in_progress, completed): (i64, i64, i64, i64) =
                sqlx::query_as(
                    "SELECT COUNT(*), \
                            COUNT(*) FILTER (WHERE status = 'pending'), \
                            COUNT(*) FILTER (WHERE status = 'in-progress'), \
                            COUNT(*) FILTER (WHERE status = 'completed') \
                     FROM tasks",
                )
                .fetch_one(&self.pool)
                .await
                .map_err(StoreError::database("query task stats"))?;
            stats.tasks.total = total;
            stats.tasks.pending = pending;
            stats.tasks.in_progress = in_progress;
            stats.tasks.completed = completed;
            Ok(stats)
        })
        .await
    }

    async fn create_user(&self, name: &str, email: &str, role: &str) -> StoreResult<User> {
        self.bounded("create user", async {
            let row: UserRow = sqlx::query_as(
                "INSERT INTO users (name, email, role) VALUES ($1, $2, $3) \
                 RETURNING id, name, email, role",
            )
            .bind(name)
            .bind(email)
            .bind(role)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::database("insert user"))?;
            tracing::info!(user_id = row.id, "user created");
            Ok(User::from(row))
        })
        .await
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

        self.bounded("create task", async {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(StoreError::database("begin create task transaction"))?;

            ensure_user_exists(&mut tx, user_id).await?;

            let row: TaskRow = sqlx::query_as(
                "INSERT INTO tasks (title, status, user_id) VALUES ($1, $2, $3) \
                 RETURNING id, title, status, user_id",
            )
            .bind(title)
            .bind(status.as_str())
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(StoreError::database("insert task"))?;

            let change = insert_history(
                &mut tx,
                NewHistoryEntry::creation(row.id, status.as_str(), &actor, Utc::now()),
            )
            .await?;

            tx.commit()
                .await
                .map_err(StoreError::database("commit create task transaction"))?;

            tracing::info!(task_id = row.id, user_id, %actor, "task created");
            row.into_task(Some(change))
        })
        .await
    }

    async fn update_task(&self, id: i64, update: TaskUpdate, actor: &str) -> StoreResult<Task> {
        let new_status = update.parsed_status()?;
        let actor = normalize_actor(actor);

        self.bounded("update task", async {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(StoreError::database("begin update task transaction"))?;

            let current: TaskRow = sqlx::query_as(
                "SELECT id, title, status, user_id FROM tasks WHERE id = $1 FOR UPDATE",
            )
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(StoreError::database("load task for update"))?
            .ok_or(StoreError::TaskNotFound(id))?;

            if let Some(user_id) = update.user_id {
                ensure_user_exists(&mut tx, user_id).await?;
            }

            let mut working = current.clone();
            let mut working_status = current.parsed_status()?;
            let now = Utc::now();
            let mut latest = None;
            let mut changed = 0_usize;

            for field in HistoryField::UPDATE_ORDER {
                let change = match field {
                    HistoryField::Title => update
                        .title
                        .as_ref()
                        .filter(|title| **title != working.title)
                        .map(|title| {
                            let from = std::mem::replace(&mut working.title, title.clone());
                            (from, title.clone())
                        }),
                    HistoryField::Status => new_status
                        .filter(|status| *status != working_status)
                        .map(|status| {
                            let from = std::mem::replace(&mut working_status, status);
                            (from.to_string(), status.to_string())
                        }),
                    HistoryField::UserId => update
                        .user_id
                        .filter(|user_id| *user_id != working.user_id)
                        .map(|user_id| {
                            let from = std::mem::replace(&mut working.user_id, user_id);
                            (from.to_string(), user_id.to_string())
                        }),
                };
                if let Some((from, to)) = change {
                    let entry = NewHistoryEntry {
                        task_id: id,
                        changed_at: now,
                        changed_by: actor.clone(),
                        field,
                        from_value: Some(from),
                        to_value: to,
                    };
                    latest = Some(insert_history(&mut tx, entry).await?);
                    changed += 1;
                }
            }

            sqlx::query("UPDATE tasks SET title = $1, status = $2, user_id = $3 WHERE id = $4")
                .bind(&working.title)
                .bind(working_status.as_str())
                .bind(working.user_id)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(StoreError::database("update task row"))?;

            let last_change = match latest {
                Some(entry) => Some(entry),
                None => latest_history(&mut tx, id).await?,
            };

            tx.commit()
                .await
                .map_err(StoreError::database("commit update task transaction"))?;

            tracing::info!(task_id = id, changed, %actor, "task updated");
            Ok(Task {
                id,
                title: working.title,
                status: working_status,
                user_id: working.user_id,
                last_change,
            })
        })
        .await
    }
}
