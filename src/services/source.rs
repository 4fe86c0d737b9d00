//! Input container handling.
//!
//! Turns an uploaded artifact into playlist text. Zip archives yield their
//! first `.m3u`/`.m3u8` entry; anything else is read as text.

use axum::body::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use std::io::{Cursor, Read};

use crate::error::{IngestError, IngestResult};

lazy_static! {
    static ref PLAYLIST_ENTRY: Regex = Regex::new(r"(?i)\.m3u8?$").unwrap();
}

/// Raw uploaded artifact
#[derive(Debug, Clone)]
pub struct PlaylistUpload {
    pub file_name: String,
    pub bytes: Bytes,
}

impl PlaylistUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn is_zip(&self) -> bool {
        self.file_name.to_lowercase().ends_with(".zip")
    }

    pub fn size_mb(&self) -> f64 {
        self.bytes.len() as f64 / 1024.0 / 1024.0
    }
}

/// Playlist text extracted from an upload
#[derive(Debug)]
pub struct LoadedPlaylist {
    /// Archive entry the text came from, when the upload was a zip
    pub entry_name: Option<String>,
    pub text: String,
}

impl LoadedPlaylist {
    pub fn size_mb(&self) -> f64 {
        self.text.len() as f64 / 1024.0 / 1024.0
    }
}

/// Extract playlist text from an upload
pub fn load_playlist(upload: &PlaylistUpload, max_size_mb: usize) -> IngestResult<LoadedPlaylist> {
    let max_bytes = max_size_mb.saturating_mul(1024 * 1024);
    if upload.bytes.len() > max_bytes {
        return Err(IngestError::TooLarge {
            size_mb: upload.size_mb(),
            limit_mb: max_size_mb,
        });
    }

    if upload.is_zip() {
        let (entry_name, raw) = extract_first_playlist(&upload.bytes, max_size_mb)?;
        return Ok(LoadedPlaylist {
            entry_name: Some(entry_name),
            text: decode_text(raw, &upload.file_name),
        });
    }

    Ok(LoadedPlaylist {
        entry_name: None,
        text: decode_text(upload.bytes.to_vec(), &upload.file_name),
    })
}

/// Read the first non-directory archive entry with a playlist extension.
/// The extracted text is held to the same size limit as the upload.
fn extract_first_playlist(bytes: &[u8], max_size_mb: usize) -> IngestResult<(String, Vec<u8>)> {
    let max_bytes = max_size_mb.saturating_mul(1024 * 1024);
    let too_large = |len: u64| IngestError::TooLarge {
        size_mb: len as f64 / 1024.0 / 1024.0,
        limit_mb: max_size_mb,
    };
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() || !PLAYLIST_ENTRY.is_match(entry.name()) {
            continue;
        }

        // Declared size first, then the real one: headers can lie
        if entry.size() > max_bytes as u64 {
            return Err(too_large(entry.size()));
        }

        let name = entry.name().to_string();
        let mut raw = Vec::with_capacity((entry.size() as usize).min(max_bytes));
        entry
            .by_ref()
            .take(max_bytes as u64 + 1)
            .read_to_end(&mut raw)?;
        if raw.len() > max_bytes {
            return Err(too_large(raw.len() as u64));
        }

        tracing::debug!(entry = %name, bytes = raw.len(), "Extracted playlist from archive");
        return Ok((name, raw));
    }

    Err(IngestError::NoPlaylistInArchive)
}

/// UTF-8 decode with lossy fallback; strips a leading BOM
fn decode_text(raw: Vec<u8>, origin: &str) -> String {
    let text = match String::from_utf8(raw) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(file = %origin, "Playlist is not valid UTF-8, decoding lossily");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };

    match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    }
}
