use std::env;
use std::time::Duration;

/// Tunable constants for the ingestion engine.
/// Values are policy, not protocol: any of them may change without
/// affecting the shape of emitted events.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Items per batch for regular uploads
    pub batch_size: usize,
    /// Items per batch when `large_scale` is set (series-heavy uploads)
    pub large_scale_batch_size: usize,
    /// Pause after each flushed batch so other tasks get scheduled
    pub batch_delay: Duration,
    /// Hard cap on items a single run will ever emit
    pub max_items_per_run: u64,
    /// Progress notification cadence, in lines
    pub progress_every_lines: u64,
    /// Longest line accepted before the input is rejected as non-playlist data
    pub max_line_bytes: usize,
    /// Bound on queued, unconsumed events per run
    pub event_channel_capacity: usize,
    /// Uploads above this size are refused before parsing
    pub max_upload_size_mb: usize,
}

impl EngineConfig {
    pub const DEFAULT_BATCH_SIZE: usize = 500;
    pub const LARGE_SCALE_BATCH_SIZE: usize = 300;
    pub const BATCH_DELAY_MS: u64 = 5;
    pub const MAX_ITEMS_PER_RUN: u64 = 1_500_000;
    pub const PROGRESS_EVERY_LINES: u64 = 500;
    pub const MAX_LINE_BYTES: usize = 32 * 1024;

    /// Batch size for a run
    pub fn batch_size_for(&self, large_scale: bool) -> usize {
        let size = if large_scale {
            self.large_scale_batch_size
        } else {
            self.batch_size
        };
        size.max(1)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: Self::DEFAULT_BATCH_SIZE,
            large_scale_batch_size: Self::LARGE_SCALE_BATCH_SIZE,
            batch_delay: Duration::from_millis(Self::BATCH_DELAY_MS),
            max_items_per_run: Self::MAX_ITEMS_PER_RUN,
            progress_every_lines: Self::PROGRESS_EVERY_LINES,
            max_line_bytes: Self::MAX_LINE_BYTES,
            event_channel_capacity: 64,
            max_upload_size_mb: 500,
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,
    pub node_env: String,

    // Parsing
    pub batch_size: usize,
    pub large_scale_batch_size: usize,
    pub batch_delay_ms: u64,
    pub max_items_per_run: u64,
    pub progress_every_lines: u64,
    pub max_line_bytes: usize,
    pub event_channel_capacity: usize,
    pub max_upload_size_mb: usize,

    // Content
    pub max_preview_items: usize,
    pub max_items_page: usize,
    pub published_store_path: String,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            // Server
            port: env_or("PORT", 3001),
            node_env: env::var("NODE_ENV").unwrap_or_else(|_| "development".to_string()),

            // Parsing
            batch_size: env_or("BATCH_SIZE", EngineConfig::DEFAULT_BATCH_SIZE),
            large_scale_batch_size: env_or(
                "LARGE_SCALE_BATCH_SIZE",
                EngineConfig::LARGE_SCALE_BATCH_SIZE,
            ),
            batch_delay_ms: env_or("BATCH_DELAY_MS", EngineConfig::BATCH_DELAY_MS),
            max_items_per_run: env_or("MAX_ITEMS_PER_RUN", EngineConfig::MAX_ITEMS_PER_RUN),
            progress_every_lines: env_or(
                "PROGRESS_EVERY_LINES",
                EngineConfig::PROGRESS_EVERY_LINES,
            ),
            max_line_bytes: env_or("MAX_LINE_BYTES", EngineConfig::MAX_LINE_BYTES),
            event_channel_capacity: env_or("EVENT_CHANNEL_CAPACITY", 64),
            max_upload_size_mb: env_or("MAX_UPLOAD_SIZE_MB", 500),

            // Content
            max_preview_items: env_or("MAX_PREVIEW_ITEMS", 50_000),
            max_items_page: env_or("MAX_ITEMS_PAGE", 5000),
            published_store_path: env::var("PUBLISHED_STORE_PATH")
                .unwrap_or_else(|_| ".published/content.ndjson".to_string()),
        }
    }

    /// Engine tunables derived from this configuration
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            batch_size: self.batch_size,
            large_scale_batch_size: self.large_scale_batch_size,
            batch_delay: Duration::from_millis(self.batch_delay_ms),
            max_items_per_run: self.max_items_per_run,
            progress_every_lines: self.progress_every_lines.max(1),
            max_line_bytes: self.max_line_bytes,
            event_channel_capacity: self.event_channel_capacity.max(1),
            max_upload_size_mb: self.max_upload_size_mb,
        }
    }

    /// Request body limit for uploads, in bytes
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
