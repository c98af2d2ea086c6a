//! HTTP Endpoints

use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::{get, post}, Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::webhook::handle_webhook;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let webhook_path = state.settings.server.webhook_path.clone();
    let timeout = Duration::from_secs(state.settings.server.timeout_seconds);

    Router::new()
        // Provider webhooks
        .route(&webhook_path, post(handle_webhook))
        .route("/webhooks/health", get(webhook_health))

        // Health and metrics
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))

        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn webhook_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "endpoint": "webhooks",
    }))
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "open_calls": state.trackers.count(),
    }))
}
