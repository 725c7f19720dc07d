//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::store::TaskStore;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Store backing every endpoint.
    pub store: Arc<dyn TaskStore>,
}

impl AppState {
    /// Wraps a store.
    #[must_use]
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }
}
