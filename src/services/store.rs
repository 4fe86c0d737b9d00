use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

use crate::models::ClassifiedItem;
use crate::services::merge_sink::PublishedContent;

/// NDJSON file written beside its target and moved over it on commit,
/// so readers never observe a half-written catalogue
pub struct NdjsonFileWriter {
    out: BufWriter<File>,
    staging: PathBuf,
    target: PathBuf,
    lines: usize,
}

impl NdjsonFileWriter {
    pub async fn create(target: &Path) -> Result<Self> {
        let staging = ContentStore::tmp_path(target);
        let file = File::create(&staging)
            .await
            .with_context(|| format!("Failed to create {}", staging.display()))?;

        Ok(Self {
            out: BufWriter::with_capacity(64 * 1024, file),
            staging,
            target: target.to_path_buf(),
            lines: 0,
        })
    }

    pub async fn append(&mut self, item: &ClassifiedItem) -> Result<()> {
        let mut line = serde_json::to_vec(item)?;
        line.push(b'\n');
        self.out.write_all(&line).await?;
        self.lines += 1;
        Ok(())
    }

    /// fsync, then rename over the target. Returns the line count.
    pub async fn commit(mut self) -> Result<usize> {
        self.out.flush().await?;
        self.out.get_ref().sync_all().await?;
        drop(self.out);

        fs::rename(&self.staging, &self.target)
            .await
            .with_context(|| format!("Failed to move {} into place", self.target.display()))?;
        Ok(self.lines)
    }

    /// Throw away the staging file; the target is untouched
    pub async fn discard(self) {
        drop(self.out);
        let _ = fs::remove_file(&self.staging).await;
    }
}

/// Sidecar written next to the items file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreMetadata {
    pub total_items: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

/// On-disk copy of the published catalogue.
/// `<path>` holds the items as NDJSON, `<path>.meta.json` the metadata.
#[derive(Debug, Clone)]
pub struct ContentStore {
    items_path: PathBuf,
    meta_path: PathBuf,
}

impl ContentStore {
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let items_path = path.as_ref().to_path_buf();
        if let Some(parent) = items_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create store directory {}", parent.display()))?;
        }

        let mut meta_path = items_path.clone().into_os_string();
        meta_path.push(".meta.json");

        Ok(Self {
            items_path,
            meta_path: PathBuf::from(meta_path),
        })
    }

    fn tmp_path(path: &Path) -> PathBuf {
        let mut tmp = path.to_path_buf().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    /// Replace the stored catalogue with `content`
    pub async fn save(&self, content: &PublishedContent) -> Result<usize> {
        let mut writer = NdjsonFileWriter::create(&self.items_path).await?;
        for item in content.items() {
            if let Err(e) = writer.append(item).await {
                writer.discard().await;
                return Err(e.context("Failed to write published item"));
            }
        }
        let written = writer.commit().await?;

        let metadata = StoreMetadata {
            total_items: written,
            last_updated: content.last_updated(),
        };
        let meta_tmp = Self::tmp_path(&self.meta_path);
        fs::write(&meta_tmp, serde_json::to_vec_pretty(&metadata)?)
            .await
            .context("Failed to write store metadata")?;
        fs::rename(&meta_tmp, &self.meta_path).await?;

        tracing::info!(path = %self.items_path.display(), items = written, "Published content saved");
        Ok(written)
    }

    /// Load the stored catalogue; a missing store yields an empty one.
    /// Lines that fail to decode are skipped.
    pub async fn load(&self) -> Result<PublishedContent> {
        let file = match File::open(&self.items_path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(PublishedContent::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open {}", self.items_path.display()));
            }
        };

        let mut lines = BufReader::new(file).lines();
        let mut items = Vec::new();
        let mut skipped = 0usize;

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ClassifiedItem>(&line) {
                Ok(item) => items.push(item),
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(error = %e, "Skipping undecodable stored item");
                }
            }
        }

        let last_updated = match fs::read(&self.meta_path).await {
            Ok(raw) => serde_json::from_slice::<StoreMetadata>(&raw)
                .map(|m| m.last_updated)
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Ignoring unreadable store metadata");
                    None
                }),
            Err(_) => None,
        };

        tracing::info!(
            path = %self.items_path.display(),
            items = items.len(),
            skipped,
            "Published content loaded"
        );

        Ok(PublishedContent::from_items(items, last_updated))
    }

    /// True when the directory holding the store is reachable
    pub async fn is_available(&self) -> bool {
        let dir = match self.items_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) => dir,
            None => Path::new("."),
        };
        fs::metadata(dir).await.map(|m| m.is_dir()).unwrap_or(false)
    }

    /// Remove the stored catalogue
    pub async fn clear(&self) -> Result<()> {
        for path in [&self.items_path, &self.meta_path] {
            match fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e).with_context(|| format!("Failed to remove {}", path.display())),
            }
        }
        Ok(())
    }
}
