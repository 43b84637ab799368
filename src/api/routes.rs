use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{get_avatar, get_user, health, AppState};
use super::openapi::openapi_json;
use crate::metrics;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Demo resources
        .route("/users/:id", get(get_user))
        .route("/users/:id/avatar", get(get_avatar))
        // Metrics endpoint (Prometheus)
        .route("/metrics", get(metrics::metrics_handler))
        // OpenAPI documentation
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(TraceLayer::new_for_http())
        // Add shared state
        .with_state(state)
}
