//! # taskboard-backend
//!
//! HTTP backend for users and tasks with a per-field audit trail of every
//! task mutation.
//!
//! Each task change is recorded as one history entry per field whose value
//! actually changed, and every task read carries its newest entry as
//! `lastChange`. Persistence sits behind the [`store::TaskStore`] trait with
//! an in-memory and a PostgreSQL implementation that behave identically.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── TaskStore (store/)
//!     │     ├── InMemoryStore
//!     │     └── PostgresStore (sqlx, row locks)
//!     │
//!     └── Domain types (domain/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod store;
