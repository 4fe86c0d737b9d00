use serde::{Deserialize, Serialize};

/// Media type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
}

impl Default for MediaKind {
    fn default() -> Self {
        Self::Movie
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Movie => write!(f, "movie"),
            MediaKind::Series => write!(f, "series"),
        }
    }
}

impl std::str::FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "movie" | "movies" => Ok(MediaKind::Movie),
            "series" => Ok(MediaKind::Series),
            other => Err(format!("unknown media kind: {}", other)),
        }
    }
}

/// One playlist entry as read from the source text (EXTINF line + URL line).
/// Transient: handed to the classifier and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub raw_title: String,
    pub logo_url: String,
    pub category_label: String,
    pub media_url: String,
}

/// Item emitted downstream in batches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub image_url: String,
    pub category: String,
    pub url: String,
    pub media_kind: MediaKind,
}

/// Parameters for a single parse run
#[derive(Debug, Clone, Copy, Default)]
pub struct RunParams {
    /// Kind assigned to entries without a season/episode marker
    pub default_media_kind: MediaKind,
    /// Selects the reduced batch size (series-heavy uploads)
    pub large_scale: bool,
}

impl RunParams {
    /// Series uploads run in large-scale mode unless told otherwise
    pub fn for_kind(default_media_kind: MediaKind, large_scale: Option<bool>) -> Self {
        Self {
            default_media_kind,
            large_scale: large_scale.unwrap_or(default_media_kind == MediaKind::Series),
        }
    }
}

/// Counters for one run. Reset at run start, only ever incremented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCounters {
    /// Lines consumed
    pub processed: u64,
    /// Items emitted (or queued for emission) so far
    pub items_found: u64,
    pub total_lines: u64,
    pub adult_skipped: u64,
    pub duplicates_skipped: u64,
    /// 4K items that replaced a lower-quality entry
    pub upgrades: u64,
    /// Metadata lines never completed by a URL line
    pub incomplete_dropped: u64,
}

/// Notification sent from a run to its consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ParseEvent {
    #[serde(rename_all = "camelCase")]
    Progress {
        message: String,
        lines_processed: u64,
        total_lines: u64,
    },
    #[serde(rename_all = "camelCase")]
    Batch {
        items: Vec<ClassifiedItem>,
        lines_processed: u64,
        total_lines: u64,
    },
    #[serde(rename_all = "camelCase")]
    Done {
        total_items_found: u64,
        message: String,
    },
    Error { message: String },
}

impl ParseEvent {
    /// Done and Error end the event sequence
    pub fn is_terminal(&self) -> bool {
        matches!(self, ParseEvent::Done { .. } | ParseEvent::Error { .. })
    }
}

/// Aggregated counts over a set of items
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentStats {
    pub total_items: usize,
    pub movie_count: usize,
    pub episode_count: usize,
}

impl ContentStats {
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a ClassifiedItem>) -> Self {
        let mut stats = Self::default();
        for item in items {
            stats.total_items += 1;
            match item.media_kind {
                MediaKind::Movie => stats.movie_count += 1,
                MediaKind::Series => stats.episode_count += 1,
            }
        }
        stats
    }
}

/// Query parameters for the upload endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadQuery {
    #[serde(default, rename = "type")]
    pub media_kind: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub large_scale: Option<bool>,
}

/// Query parameters for content listing endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsQuery {
    #[serde(default)]
    pub media_kind: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// Paginated items response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsResponse {
    pub items: Vec<ClassifiedItem>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

/// Content metadata response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentStatsResponse {
    pub published: ContentStats,
    pub preview: ContentStats,
    pub has_unpublished: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}
