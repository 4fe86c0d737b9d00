use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

use crate::error::{IngestError, IngestResult};
use crate::models::RawRecord;

/// Directive opening a playlist entry
pub const EXTINF_PREFIX: &str = "#EXTINF:";

/// Title used when the EXTINF line has nothing after the comma
pub const DEFAULT_TITLE: &str = "Sem título";
/// Category used when group-title is missing
pub const DEFAULT_CATEGORY: &str = "Sem Categoria";

lazy_static! {
    /// Regex to parse EXTINF attributes (tvg-logo="...", group-title="...", etc)
    static ref ATTR_REGEX: Regex = Regex::new(r#"(\w+(?:-\w+)*)="([^"]*)""#).unwrap();
}

/// Parsed EXTINF line data, waiting for its URL line
#[derive(Debug, Default)]
struct ExtinfData {
    attributes: HashMap<String, String>,
    title: String,
}

/// Parse an EXTINF line
/// Format: #EXTINF:duration tvg-id="..." tvg-logo="..." group-title="...",Title
fn parse_extinf(line: &str) -> Option<ExtinfData> {
    let content = line.strip_prefix(EXTINF_PREFIX)?;

    let title = content
        .find(',')
        .map(|idx| content[idx + 1..].trim())
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TITLE)
        .to_string();

    let attributes = ATTR_REGEX
        .captures_iter(content)
        .filter_map(|caps| {
            let key = caps.get(1)?.as_str().to_string();
            let value = caps.get(2)?.as_str().to_string();
            Some((key, value))
        })
        .collect();

    Some(ExtinfData { attributes, title })
}

/// Classification of a single source line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Metadata,
    Comment,
    Url,
}

impl LineKind {
    pub fn of(trimmed: &str) -> Self {
        if trimmed.is_empty() {
            LineKind::Blank
        } else if trimmed.starts_with(EXTINF_PREFIX) {
            LineKind::Metadata
        } else if trimmed.starts_with('#') {
            LineKind::Comment
        } else {
            LineKind::Url
        }
    }
}

/// Single-pass M3U scanner.
///
/// Fed one line at a time; returns a [`RawRecord`] whenever a URL line
/// completes the pending EXTINF entry. A new EXTINF line replaces an
/// unfinished one, which is counted as dropped.
#[derive(Debug)]
pub struct PlaylistScanner {
    pending: Option<ExtinfData>,
    max_line_bytes: usize,
    lines_seen: u64,
    dropped: u64,
}

impl PlaylistScanner {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            pending: None,
            max_line_bytes,
            lines_seen: 0,
            dropped: 0,
        }
    }

    /// Consume one line (without its terminator)
    pub fn feed_line(&mut self, line: &str) -> IngestResult<Option<RawRecord>> {
        self.lines_seen += 1;

        if line.len() > self.max_line_bytes {
            return Err(IngestError::LineTooLong {
                line: self.lines_seen,
                limit: self.max_line_bytes,
            });
        }

        let trimmed = line.trim();

        match LineKind::of(trimmed) {
            LineKind::Blank | LineKind::Comment => Ok(None),
            LineKind::Metadata => {
                if self.pending.is_some() {
                    self.dropped += 1;
                }
                self.pending = parse_extinf(trimmed);
                Ok(None)
            }
            LineKind::Url => {
                let Some(extinf) = self.pending.take() else {
                    return Ok(None);
                };

                let mut attributes = extinf.attributes;
                Ok(Some(RawRecord {
                    raw_title: extinf.title,
                    logo_url: attributes.remove("tvg-logo").unwrap_or_default(),
                    category_label: attributes
                        .remove("group-title")
                        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
                    media_url: trimmed.to_string(),
                }))
            }
        }
    }

    /// End of input: an entry still waiting for its URL is dropped
    pub fn finish(&mut self) -> u64 {
        if self.pending.take().is_some() {
            self.dropped += 1;
        }
        self.dropped
    }
}

/// Number of lines in a text, counted the way the scanner splits them
pub fn count_lines(text: &str) -> u64 {
    text.lines().count() as u64
}
