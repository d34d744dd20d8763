//! Route definitions for the HTTP API

use axum::{
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::HttpConfig;
use crate::AppState;

use super::api;

/// Create the main router with all routes
pub fn create_router(app_state: Arc<AppState>, config: &HttpConfig) -> Router {
    let cors = if config.cors_enabled {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/api/status", get(api::get_status))
        .route("/api/catalog", get(api::get_catalog))
        .route("/api/control-types", get(api::get_control_types))
        // Asset instances
        .route("/api/assets", get(api::list_assets).post(api::add_asset))
        .route(
            "/api/assets/{id}",
            patch(api::update_asset).delete(api::remove_asset),
        )
        .route("/api/assets/{id}/animation", post(api::play_animation))
        // Session control
        .route("/api/session/start", post(api::start_session))
        .route("/api/session/stop", post(api::stop_session))
        .route("/api/camera/pause", post(api::pause_camera))
        .route("/api/camera/resume", post(api::resume_camera))
        // SSE streams for the overlay
        .route("/api/stream", get(api::frame_stream))
        .route("/api/status/stream", get(api::status_stream))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
