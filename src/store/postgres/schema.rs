//! Schema bootstrap and seed-on-empty for the PostgreSQL store.
//!
//! Both steps are idempotent and run on every boot.

use sqlx::{PgConnection, PgPool};

use crate::domain::DEFAULT_ACTOR;
use crate::store::seed::{SEED_TASKS, seed_users};
use crate::store::{StoreError, StoreResult};

/// DDL statements, applied in order.
pub const SCHEMA_STATEMENTS: [&str; 7] = [
    "CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        role TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS tasks (
        id BIGSERIAL PRIMARY KEY,
        title TEXT NOT NULL,
        status TEXT NOT NULL CHECK (status IN ('pending', 'in-progress', 'completed')),
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE RESTRICT
    )",
    "CREATE TABLE IF NOT EXISTS task_history (
        id BIGSERIAL PRIMARY KEY,
        task_id BIGINT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
        changed_at TIMESTAMPTZ NOT NULL,
        changed_by TEXT NOT NULL,
        field TEXT NOT NULL CHECK (field IN ('title', 'status', 'userId')),
        from_value TEXT,
        to_value TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_user_id ON tasks(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_task_history_task_id ON task_history(task_id)",
    "CREATE INDEX IF NOT EXISTS idx_task_history_changed_at ON task_history(changed_at DESC)",
];

/// Creates tables and indexes if they do not exist.
///
/// # Errors
///
/// Returns [`StoreError::Database`] if any statement fails.
pub async fn init_schema(pool: &PgPool) -> StoreResult<()> {
    for statement in SCHEMA_STATEMENTS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(StoreError::database("initialize schema"))?;
    }
    tracing::debug!(statements = SCHEMA_STATEMENTS.len(), "schema ensured");
    Ok(())
}

/// Inserts the seed dataset into each table that is empty.
///
/// Runs in a single transaction. Seed rows carry explicit ids, so the
/// serial sequences are moved past them afterwards.
///
/// # Errors
///
/// Returns [`StoreError::Database`] on failure; nothing is committed.
pub async fn seed_initial_data(pool: &PgPool) -> StoreResult<()> {
    let mut tx = pool
        .begin()
        .await
        .map_err(StoreError::database("begin seed transaction"))?;

    let users_seeded = if count_rows(&mut tx, "SELECT COUNT(*) FROM users").await? == 0 {
        for user in seed_users() {
            sqlx::query("INSERT INTO users (id, name, email, role) VALUES ($1, $2, $3, $4)")
                .bind(user.id)
                .bind(&user.name)
                .bind(&user.email)
                .bind(&user.role)
                .execute(&mut *tx)
                .await
                .map_err(StoreError::database("seed users"))?;
        }
        resync_sequence(&mut tx, "users").await?;
        true
    } else {
        false
    };

    let tasks_seeded = if count_rows(&mut tx, "SELECT COUNT(*) FROM tasks").await? == 0 {
        for task in SEED_TASKS {
            sqlx::query("INSERT INTO tasks (id, title, status, user_id) VALUES ($1, $2, $3, $4)")
                .bind(task.id)
                .bind(task.title)
                .bind(task.status.as_str())
                .bind(task.user_id)
                .execute(&mut *tx)
                .await
                .map_err(StoreError::database("seed tasks"))?;
        }
        resync_sequence(&mut tx, "tasks").await?;
        true
    } else {
        false
    };

    let history_seeded =
        if count_rows(&mut tx, "SELECT COUNT(*) FROM task_history").await? == 0 {
            sqlx::query(
                "INSERT INTO task_history (task_id, changed_at, changed_by, field, from_value, to_value) \
                 SELECT id, NOW(), $1, 'status', NULL, status FROM tasks",
            )
            .bind(DEFAULT_ACTOR)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::database("seed task history"))?;
            true
        } else {
            false
        };

    tx.commit()
        .await
        .map_err(StoreError::database("commit seed transaction"))?;

    tracing::info!(users_seeded, tasks_seeded, history_seeded, "seed check complete");
    Ok(())
}

async fn count_rows(conn: &mut PgConnection, sql: &'static str) -> StoreResult<i64> {
    sqlx::query_scalar::<_, i64>(sql)
        .fetch_one(conn)
        .await
        .map_err(StoreError::database("count seed rows"))
}

/// Moves the table's id sequence to its current maximum id.
async fn resync_sequence(conn: &mut PgConnection, table: &'static str) -> StoreResult<()> {
    let sql = format!(
        "SELECT setval(pg_get_serial_sequence('{table}', 'id'), \
         COALESCE((SELECT MAX(id) FROM {table}), 1), true)"
    );
    sqlx::query(&sql)
        .execute(conn)
        .await
        .map_err(StoreError::database("resync id sequence"))?;
    Ok(())
}
