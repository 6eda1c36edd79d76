use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::AppState;

/// Build the application router with all routes
pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::healthcheck))
        // Inventory
        .route("/api/devices", get(handlers::devices::list_devices))
        // Device actions
        .route("/api/ping/:device_id", post(handlers::actions::ping_device))
        .route("/api/backup/:device_id", post(handlers::actions::backup_device))
        .route("/api/backup/:device_id/diff", get(handlers::actions::diff_backups))
        .route("/api/restart/:device_id", post(handlers::actions::restart_device))
        .route("/api/uptime/:device_id", post(handlers::actions::device_uptime))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
