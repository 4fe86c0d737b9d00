use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::models::{ContentStatsResponse, ItemsQuery, ItemsResponse, MediaKind};
use crate::services::merge_sink::paginate;
use crate::AppState;

type ApiError = (StatusCode, Json<serde_json::Value>);

fn kind_filter(raw: Option<&str>) -> Result<Option<MediaKind>, ApiError> {
    raw.map(str::parse::<MediaKind>).transpose().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Tipo inválido (use movie ou series)" })),
        )
    })
}

/// Publish response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub added: usize,
    pub total: usize,
    pub last_updated: Option<String>,
}

/// GET /api/content/preview - Paginated preview items
pub async fn get_preview(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ItemsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let media_kind = kind_filter(query.media_kind.as_deref())?;
    let limit = query.limit.min(state.config.max_items_page);
    let offset = query.offset;

    let (items, total) = {
        let preview = state.preview.read().await;
        paginate(preview.items(), media_kind, offset, limit)
    };
    let has_more = offset + items.len() < total;

    Ok(Json(ItemsResponse {
        items,
        total,
        limit,
        offset,
        has_more,
    }))
}

/// DELETE /api/content/preview - Discard the preview
pub async fn clear_preview(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut preview = state.preview.write().await;
    let cleared = preview.len();
    preview.clear();
    tracing::info!(cleared, "Preview cleared");

    Json(serde_json::json!({ "cleared": cleared }))
}

/// POST /api/content/publish - Merge preview into published content and persist
pub async fn publish(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let preview = state.preview.read().await;
    let mut published = state.published.write().await;

    let added = published.publish(&preview);
    drop(preview);

    state.store.save(&published).await.map_err(|e| {
        tracing::error!("Failed to persist published content: {:#}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "Erro ao salvar conteúdo" })),
        )
    })?;

    tracing::info!(added, total = published.len(), "Preview published");

    Ok(Json(PublishResponse {
        added,
        total: published.len(),
        last_updated: published.last_updated().map(|t| t.to_rfc3339()),
    }))
}

/// GET /api/content/published - Paginated published items
pub async fn get_published(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ItemsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let media_kind = kind_filter(query.media_kind.as_deref())?;
    let limit = query.limit.min(state.config.max_items_page);
    let offset = query.offset;

    let (items, total) = {
        let published = state.published.read().await;
        paginate(published.items(), media_kind, offset, limit)
    };
    let has_more = offset + items.len() < total;

    Ok(Json(ItemsResponse {
        items,
        total,
        limit,
        offset,
        has_more,
    }))
}

/// DELETE /api/content/published - Remove all published content
pub async fn clear_published(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let mut published = state.published.write().await;
    let cleared = published.len();
    published.clear();

    state.store.clear().await.map_err(|e| {
        tracing::error!("Failed to clear store: {:#}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "Erro ao limpar conteúdo" })),
        )
    })?;

    tracing::info!(cleared, "Published content cleared");
    Ok(Json(serde_json::json!({ "cleared": cleared })))
}

/// GET /api/content/stats - Counts for preview and published content
pub async fn get_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    // preview before published, same order as publish()
    let preview = state.preview.read().await;
    let published = state.published.read().await;

    Json(ContentStatsResponse {
        published: published.stats(),
        preview: preview.stats(),
        has_unpublished: published.has_unpublished(&preview),
        last_updated: published.last_updated().map(|t| t.to_rfc3339()),
    })
}
