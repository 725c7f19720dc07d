//! taskboard-backend server entry point.
//!
//! Loads configuration, opens the selected store, and serves the REST API
//! until SIGINT or SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use taskboard_backend::api;
use taskboard_backend::app_state::AppState;
use taskboard_backend::config::{ServiceConfig, StoreBackend};
use taskboard_backend::store::{InMemoryStore, PostgresStore, TaskStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env().context("loading configuration")?;
    init_tracing(config.log_json);
    tracing::info!(
        addr = %config.listen_addr,
        backend = ?config.store_backend,
        "starting taskboard-backend"
    );

    let (store, postgres): (Arc<dyn TaskStore>, Option<PostgresStore>) =
        match config.store_backend {
            StoreBackend::Postgres => {
                let store = PostgresStore::connect(&config.postgres_settings())
                    .await
                    .context("connecting to PostgreSQL")?;
                (Arc::new(store.clone()), Some(store))
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory store; data is lost on exit");
                (Arc::new(InMemoryStore::seeded()), None)
            }
        };

    let app = api::build_router()
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState::new(store));

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    if let Some(store) = postgres {
        store.close().await;
    }
    tracing::info!("shutdown complete");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
