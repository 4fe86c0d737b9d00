mod config;
mod error;
mod metrics;
mod models;
mod routes;
mod services;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::services::{
    merge_sink::{PreviewCollection, PublishedContent},
    store::ContentStore,
};

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub preview: RwLock<PreviewCollection>,
    pub published: RwLock<PublishedContent>,
    pub store: ContentStore,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config, store: ContentStore, published: PublishedContent) -> Self {
        let preview = PreviewCollection::new(config.max_preview_items);
        Self {
            config,
            preview: RwLock::new(preview),
            published: RwLock::new(published),
            store,
            start_time: Instant::now(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playlist_ingest=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Load configuration
    let config = Config::from_env();
    let port = config.port;

    tracing::info!("Starting Playlist Ingest v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.node_env);
    tracing::info!(
        batch_size = config.batch_size,
        large_scale_batch_size = config.large_scale_batch_size,
        max_items_per_run = config.max_items_per_run,
        max_upload_size_mb = config.max_upload_size_mb,
        "Engine configured"
    );

    // Published content survives restarts
    let store = ContentStore::new(&config.published_store_path).await?;
    let published = store.load().await?;
    if published.is_empty() {
        tracing::info!("Content store ready: {} (nothing published yet)", config.published_store_path);
    } else {
        tracing::info!(
            "Content store ready: {} ({} published items)",
            config.published_store_path,
            published.len()
        );
    }

    let state = Arc::new(AppState::new(config, store, published));
    let app = routes::router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
