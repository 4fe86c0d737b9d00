use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use futures::StreamExt;
use std::sync::Arc;

use crate::models::{MediaKind, ParseEvent, RunParams, UploadQuery};
use crate::services::engine::spawn_run;
use crate::services::source::PlaylistUpload;
use crate::AppState;

/// POST /api/playlist/upload - Parse an uploaded playlist (plain or zipped)
///
/// Responds with an NDJSON stream, one event per line. Batches are merged
/// into the preview as they pass through; closing the connection cancels
/// the run.
pub async fn upload_playlist(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let media_kind = match query.media_kind.as_deref() {
        None => MediaKind::default(),
        Some(raw) => raw.parse::<MediaKind>().map_err(|e| {
            tracing::warn!("Rejected upload: {}", e);
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": "Tipo inválido (use movie ou series)" })),
            )
        })?,
    };

    if body.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Arquivo vazio" })),
        ));
    }

    let file_name = query
        .filename
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "playlist.m3u".to_string());
    let params = RunParams::for_kind(media_kind, query.large_scale);
    let upload = PlaylistUpload::new(file_name, body);

    tracing::info!(
        file = %upload.file_name,
        size_mb = upload.size_mb(),
        media_kind = %params.default_media_kind,
        large_scale = params.large_scale,
        "Playlist upload received"
    );

    let run = spawn_run(state.config.engine(), upload, params);
    let run_id = run.run_id();

    let lines = async_stream::stream! {
        let events = run.into_stream();
        futures::pin_mut!(events);

        while let Some(event) = events.next().await {
            let mut line = match serde_json::to_vec(&event) {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!(run_id = %run_id, "Failed to encode event: {}", e);
                    continue;
                }
            };
            line.push(b'\n');
            let terminal = event.is_terminal();

            if let ParseEvent::Batch { items, .. } = event {
                let outcome = state.preview.write().await.merge_batch(items);
                tracing::debug!(
                    run_id = %run_id,
                    added = outcome.added,
                    duplicates = outcome.duplicates,
                    evicted = outcome.evicted,
                    "Batch merged into preview"
                );
            }

            yield Ok::<Bytes, std::io::Error>(Bytes::from(line));

            // done/error close the response
            if terminal {
                break;
            }
        }
    };

    Ok((
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(lines),
    ))
}
