//! Ingest server library logic.

pub mod api_events;
pub mod batch;
pub mod config;
pub mod dto;
pub mod lookup;
pub mod middleware;
pub mod reader;

#[cfg(test)]
mod test_support;

use axum::{
    routing::{get, post},
    Extension, Json, Router,
};
use config::IngestConfig;
use ingest_store::EventStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Event persistence.
    pub store: Arc<dyn EventStore>,
    /// Upper bound on batch items stored at the same time.
    pub max_concurrency: usize,
    /// Largest accepted `POST /api/v2/event` body.
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn EventStore>, max_concurrency: usize, max_body_bytes: usize) -> Self {
        Self {
            store,
            max_concurrency: max_concurrency.max(1),
            max_body_bytes,
        }
    }

    pub fn from_config(store: Arc<dyn EventStore>, config: &IngestConfig) -> Self {
        Self::new(store, config.max_concurrency, config.max_body_bytes)
    }
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v2/event", post(api_events::add_events_handler))
        .route(
            "/api/v2/event/id/{id}",
            get(api_events::event_by_id_handler),
        )
        .layer(axum::middleware::from_fn(
            middleware::correlation_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
