pub mod content;
pub mod health;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_bytes();

    Router::new()
        // Health endpoints
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .route("/ready", get(health::ready))
        .route("/live", get(health::live))
        // Playlist ingestion
        .route(
            "/api/playlist/upload",
            post(upload::upload_playlist).layer(DefaultBodyLimit::max(upload_limit)),
        )
        // Preview / published content
        .route(
            "/api/content/preview",
            get(content::get_preview).delete(content::clear_preview),
        )
        .route("/api/content/publish", post(content::publish))
        .route(
            "/api/content/published",
            get(content::get_published).delete(content::clear_published),
        )
        .route("/api/content/stats", get(content::get_stats))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
