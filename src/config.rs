//! Service configuration loaded from environment variables.
//!
//! All settings come from environment variables (or a `.env` file via
//! `dotenvy`). Unset or unparsable numeric values fall back to defaults;
//! only the listen address, the backend name, and a missing database URL
//! for the PostgreSQL backend are hard errors.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::store::PostgresSettings;

/// Which [`crate::store::TaskStore`] implementation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Durable PostgreSQL store.
    Postgres,
    /// Seeded in-memory store; state is lost on exit.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(ConfigError::InvalidBackend(other.to_string())),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `LISTEN_ADDR` or `PORT` could not be parsed.
    #[error("invalid listen address {0:?}")]
    InvalidListenAddr(String),

    /// `STORE_BACKEND` named an unknown backend.
    #[error("unknown store backend {0:?} (expected \"postgres\" or \"memory\")")]
    InvalidBackend(String),

    /// The PostgreSQL backend was selected without a connection string.
    #[error("POSTGRES_DSN is required when STORE_BACKEND=postgres")]
    MissingDatabaseUrl,
}

/// Top-level service configuration.
///
/// Loaded once at startup via [`ServiceConfig::from_env`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Socket address to bind the HTTP server to.
    pub listen_addr: SocketAddr,

    /// Selected store implementation.
    pub store_backend: StoreBackend,

    /// PostgreSQL connection string (empty for the memory backend).
    pub database_url: String,

    /// Maximum number of database connections in the pool.
    pub database_max_connections: u32,

    /// Minimum idle connections in the pool.
    pub database_min_connections: u32,

    /// Seconds allowed for acquiring a connection and for each startup ping.
    pub database_connect_timeout_secs: u64,

    /// Seconds allowed for each store operation.
    pub database_operation_timeout_secs: u64,

    /// Startup ping attempts before giving up.
    pub database_ping_retries: u32,

    /// Milliseconds between startup ping attempts.
    pub database_ping_backoff_ms: u64,

    /// Seconds before an HTTP request is aborted.
    pub request_timeout_secs: u64,

    /// Emit logs as JSON lines instead of human-readable text.
    pub log_json: bool,
}

impl ServiceConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the listen address or backend cannot
    /// be parsed, or if the PostgreSQL backend lacks `POSTGRES_DSN` and
    /// `DATABASE_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ServiceConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_addr = match (lookup("LISTEN_ADDR"), lookup("PORT")) {
            (Some(addr), _) => addr,
            (None, Some(port)) => format!("0.0.0.0:{}", port.trim()),
            (None, None) => "0.0.0.0:8080".to_string(),
        };
        let listen_addr: SocketAddr = listen_addr
            .parse()
            .map_err(|_| ConfigError::InvalidListenAddr(listen_addr.clone()))?;

        let store_backend = lookup("STORE_BACKEND")
            .map_or(Ok(StoreBackend::Postgres), |raw| raw.parse())?;

        let database_url = lookup("POSTGRES_DSN")
            .or_else(|| lookup("DATABASE_URL"))
            .map(|url| url.trim().to_string())
            .unwrap_or_default();
        if store_backend == StoreBackend::Postgres && database_url.is_empty() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        Ok(Self {
            listen_addr,
            store_backend,
            database_url,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 20),
            database_min_connections: parse_or(&lookup, "DATABASE_MIN_CONNECTIONS", 0),
            database_connect_timeout_secs: parse_or(&lookup, "DATABASE_CONNECT_TIMEOUT_SECS", 3),
            database_operation_timeout_secs: parse_or(
                &lookup,
                "DATABASE_OPERATION_TIMEOUT_SECS",
                3,
            ),
            database_ping_retries: parse_or(&lookup, "DATABASE_PING_RETRIES", 20),
            database_ping_backoff_ms: parse_or(&lookup, "DATABASE_PING_BACKOFF_MS", 1000),
            request_timeout_secs: parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 15),
            log_json: lookup("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
        })
    }

    /// Settings for [`crate::store::PostgresStore::connect`].
    #[must_use]
    pub fn postgres_settings(&self) -> PostgresSettings {
        PostgresSettings {
            database_url: self.database_url.clone(),
            max_connections: self.database_max_connections,
            min_connections: self.database_min_connections,
            connect_timeout: Duration::from_secs(self.database_connect_timeout_secs),
            operation_timeout: Duration::from_secs(self.database_operation_timeout_secs),
            ping_retries: self.database_ping_retries,
            ping_backoff: Duration::from_millis(self.database_ping_backoff_ms),
        }
    }

    /// HTTP request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Parses a variable as `T`, returning `default` on missing or invalid
/// values.
fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServiceConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_with_memory_backend() {
        let Ok(config) = load(&[("STORE_BACKEND", "memory")]) else {
            panic!("config should load");
        };
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.database_operation_timeout_secs, 3);
        assert_eq!(config.database_ping_retries, 20);
        assert!(!config.log_json);
    }

    #[test]
    fn postgres_requires_database_url() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingDatabaseUrl)));
        let Ok(config) = load(&[("DATABASE_URL", "postgres://localhost/tasks")]) else {
            panic!("fallback url should be accepted");
        };
        assert_eq!(config.database_url, "postgres://localhost/tasks");
    }

    #[test]
    fn postgres_dsn_takes_precedence() {
        let Ok(config) = load(&[
            ("POSTGRES_DSN", " postgres://primary/db "),
            ("DATABASE_URL", "postgres://fallback/db"),
        ]) else {
            panic!("config should load");
        };
        assert_eq!(config.database_url, "postgres://primary/db");
    }

    #[test]
    fn port_only_binds_all_interfaces() {
        let Ok(config) = load(&[("STORE_BACKEND", "memory"), ("PORT", "9090")]) else {
            panic!("config should load");
        };
        assert_eq!(config.listen_addr.to_string(), "0.0.0.0:9090");
    }

    #[test]
    fn invalid_values() {
        assert!(matches!(
            load(&[("STORE_BACKEND", "redis")]),
            Err(ConfigError::InvalidBackend(_))
        ));
        assert!(matches!(
            load(&[("STORE_BACKEND", "memory"), ("LISTEN_ADDR", "nope")]),
            Err(ConfigError::InvalidListenAddr(_))
        ));
        let Ok(config) = load(&[
            ("STORE_BACKEND", "memory"),
            ("DATABASE_PING_RETRIES", "many"),
        ]) else {
            panic!("bad numbers fall back to defaults");
        };
        assert_eq!(config.database_ping_retries, 20);
    }

    #[test]
    fn postgres_settings_carry_timeouts() {
        let Ok(config) = load(&[
            ("POSTGRES_DSN", "postgres://db"),
            ("DATABASE_OPERATION_TIMEOUT_SECS", "5"),
            ("DATABASE_PING_BACKOFF_MS", "250"),
        ]) else {
            panic!("config should load");
        };
        let settings = config.postgres_settings();
        assert_eq!(settings.operation_timeout, Duration::from_secs(5));
        assert_eq!(settings.ping_backoff, Duration::from_millis(250));
        assert_eq!(settings.max_connections, 20);
    }
}
