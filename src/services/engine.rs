use futures::Stream;
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{IngestError, RunError};
use crate::metrics::{BATCHES_FLUSHED, ITEMS_EMITTED, RECORDS_SKIPPED, RUNS_FINISHED, RUNS_STARTED};
use crate::models::{ClassifiedItem, MediaKind, ParseEvent, RawRecord, RunCounters, RunParams};
use crate::services::classifier::ContentClassifier;
use crate::services::scanner::{count_lines, PlaylistScanner};
use crate::services::source::{load_playlist, PlaylistUpload};

/// Lifecycle of one engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Scanning,
    Flushing,
    Draining,
    Done,
    Error,
}

/// Position of an accepted item inside the not-yet-flushed batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BatchSlot {
    batch: u64,
    index: usize,
}

#[derive(Debug, Clone, Copy)]
struct SeenMovie {
    is_4k: bool,
    slot: BatchSlot,
}

/// Dedup decision for a movie candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovieVerdict {
    /// Key never seen in this run
    Accept,
    /// 4K candidate beats an accepted non-4K item. `replace` is set when that
    /// item is still in the current batch and can be overwritten in place.
    Upgrade { replace: Option<usize> },
    Duplicate,
}

/// Movie dedup keys seen during one run. Owned by the engine, dropped with it.
#[derive(Debug, Default)]
pub struct SeenMoviesIndex {
    entries: HashMap<String, SeenMovie>,
}

impl SeenMoviesIndex {
    fn check(&self, key: &str, is_4k: bool, current_batch: u64) -> MovieVerdict {
        match self.entries.get(key) {
            None => MovieVerdict::Accept,
            Some(seen) if is_4k && !seen.is_4k => MovieVerdict::Upgrade {
                replace: (seen.slot.batch == current_batch).then_some(seen.slot.index),
            },
            Some(_) => MovieVerdict::Duplicate,
        }
    }

    fn record(&mut self, key: String, is_4k: bool, slot: BatchSlot) {
        self.entries.insert(key, SeenMovie { is_4k, slot });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Final report of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub counters: RunCounters,
    pub batches: u64,
    /// Stopped by the hard item cap
    pub capped: bool,
    pub elapsed_ms: u128,
}

/// Streaming dedup/batch engine.
///
/// Drives the scanner and classifier over one playlist, keeps movie dedup
/// state for the run and delivers accepted items in bounded batches over an
/// mpsc channel. One instance serves exactly one run.
pub struct IngestEngine {
    run_id: Uuid,
    config: EngineConfig,
    params: RunParams,
    state: EngineState,
    counters: RunCounters,
    seen_movies: SeenMoviesIndex,
    batch: Vec<ClassifiedItem>,
    batch_seq: u64,
    batches_sent: u64,
    events: mpsc::Sender<ParseEvent>,
}

impl IngestEngine {
    pub fn new(
        run_id: Uuid,
        config: EngineConfig,
        params: RunParams,
        events: mpsc::Sender<ParseEvent>,
    ) -> Self {
        Self {
            run_id,
            config,
            params,
            state: EngineState::Idle,
            counters: RunCounters::default(),
            seen_movies: SeenMoviesIndex::default(),
            batch: Vec::new(),
            batch_seq: 0,
            batches_sent: 0,
            events,
        }
    }

    fn transition(&mut self, next: EngineState) {
        tracing::debug!(run_id = %self.run_id, from = ?self.state, to = ?next, "Engine state change");
        self.state = next;
    }

    async fn emit(&self, event: ParseEvent) -> Result<(), RunError> {
        self.events.send(event).await.map_err(|_| RunError::Cancelled)
    }

    async fn emit_progress(&self, message: String) -> Result<(), RunError> {
        self.emit(ParseEvent::Progress {
            message,
            lines_processed: self.counters.processed,
            total_lines: self.counters.total_lines,
        })
        .await
    }

    /// Terminal failure: one error notification, nothing else
    async fn fail(&mut self, error: IngestError) -> Result<RunSummary, RunError> {
        self.transition(EngineState::Error);
        let _ = self
            .emit(ParseEvent::Error {
                message: error.to_string(),
            })
            .await;
        Err(RunError::Failed(error))
    }

    /// Acquire the playlist text from an upload, then run over it
    pub async fn run_upload(mut self, upload: PlaylistUpload) -> Result<RunSummary, RunError> {
        self.emit_progress(format!("Carregando {}...", upload.file_name)).await?;

        let max_size_mb = self.config.max_upload_size_mb;
        let loaded = tokio::task::spawn_blocking(move || load_playlist(&upload, max_size_mb))
            .await
            .map_err(|e| IngestError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))
            .and_then(|result| result);

        let loaded = match loaded {
            Ok(loaded) => loaded,
            Err(e) => return self.fail(e).await,
        };

        if let Some(entry) = &loaded.entry_name {
            self.emit_progress(format!("Extraindo {}...", entry)).await?;
        }
        self.emit_progress(format!("Arquivo carregado ({:.2} MB)", loaded.size_mb()))
            .await?;

        self.run(&loaded.text).await
    }

    /// Scan a full playlist text, emitting batches and a final summary
    pub async fn run(mut self, text: &str) -> Result<RunSummary, RunError> {
        let started = Instant::now();
        let batch_size = self.config.batch_size_for(self.params.large_scale);
        let progress_every = self.config.progress_every_lines.max(1);
        let max_items = self.config.max_items_per_run;

        // Fresh counters; total is known up front for progress reporting
        self.transition(EngineState::Scanning);
        self.counters = RunCounters {
            total_lines: count_lines(text),
            ..RunCounters::default()
        };
        self.batch = Vec::with_capacity(batch_size);

        tracing::info!(
            run_id = %self.run_id,
            total_lines = self.counters.total_lines,
            default_kind = %self.params.default_media_kind,
            large_scale = self.params.large_scale,
            batch_size,
            "Parse run started"
        );

        self.emit_progress(format!("Analisando {} linhas...", self.counters.total_lines))
            .await?;

        let mut scanner = PlaylistScanner::new(self.config.max_line_bytes);
        let mut capped = false;

        for line in text.lines() {
            // Hard cap: stop before reading anything more
            if self.counters.items_found >= max_items {
                capped = true;
                break;
            }

            self.counters.processed += 1;

            // Progress every N lines
            if self.counters.processed % progress_every == 0 {
                self.emit_progress(format!("Processando… {} itens", self.counters.items_found))
                    .await?;
            }

            let record = match scanner.feed_line(line) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => return self.fail(e).await,
            };

            self.accept(record);

            // Flush batch when full
            if self.batch.len() >= batch_size {
                self.flush().await?;
            }
        }

        // Entry still waiting for its URL at end of input
        let incomplete = scanner.finish();
        self.counters.incomplete_dropped = incomplete;
        if incomplete > 0 {
            RECORDS_SKIPPED.with_label_values(&["incomplete"]).inc_by(incomplete);
        }

        if capped {
            tracing::warn!(
                run_id = %self.run_id,
                max_items,
                lines_processed = self.counters.processed,
                "Item cap reached, stopping scan"
            );
        }

        // Drain the partial batch, no yield needed
        self.transition(EngineState::Draining);
        if !self.batch.is_empty() {
            self.send_batch().await?;
        }

        // Final notification
        self.transition(EngineState::Done);
        let found = self.counters.items_found;
        let message = if capped {
            format!("Limite de {} itens atingido: {} itens carregados", max_items, found)
        } else {
            format!("Processamento finalizado: {} itens", found)
        };
        self.emit(ParseEvent::Done {
            total_items_found: found,
            message,
        })
        .await?;

        let summary = RunSummary {
            run_id: self.run_id,
            counters: self.counters,
            batches: self.batches_sent,
            capped,
            elapsed_ms: started.elapsed().as_millis(),
        };

        tracing::info!(
            run_id = %self.run_id,
            items_found = found,
            lines = self.counters.processed,
            batches = summary.batches,
            adult_skipped = self.counters.adult_skipped,
            duplicates_skipped = self.counters.duplicates_skipped,
            upgrades = self.counters.upgrades,
            incomplete_dropped = self.counters.incomplete_dropped,
            distinct_movies = self.seen_movies.len(),
            elapsed_ms = summary.elapsed_ms as u64,
            "Parse run complete"
        );

        Ok(summary)
    }

    /// Apply classifier and dedup policy to one record
    fn accept(&mut self, record: RawRecord) {
        let classification =
            ContentClassifier::classify(&record.raw_title, &record.category_label);

        if classification.is_adult {
            self.counters.adult_skipped += 1;
            RECORDS_SKIPPED.with_label_values(&["adult"]).inc();
            return;
        }

        let media_kind = classification.media_kind(self.params.default_media_kind);
        let item = ClassifiedItem {
            id: ContentClassifier::item_id(&record.raw_title, &record.media_url),
            title: record.raw_title,
            image_url: record.logo_url,
            category: record.category_label,
            url: record.media_url,
            media_kind,
        };

        // Every episode is unique; only movies go through the index
        if media_kind == MediaKind::Series {
            self.push(item);
            return;
        }

        let key = ContentClassifier::dedup_key(&item.title);
        let is_4k = ContentClassifier::is_4k(&item.title);

        match self.seen_movies.check(&key, is_4k, self.batch_seq) {
            MovieVerdict::Accept => {
                let slot = self.push(item);
                self.seen_movies.record(key, is_4k, slot);
            }
            MovieVerdict::Upgrade { replace: Some(index) } => {
                tracing::debug!(run_id = %self.run_id, key = %key, "4K item replaces queued entry");
                self.batch[index] = item;
                self.counters.upgrades += 1;
                let slot = BatchSlot {
                    batch: self.batch_seq,
                    index,
                };
                self.seen_movies.record(key, is_4k, slot);
            }
            MovieVerdict::Upgrade { replace: None } => {
                tracing::debug!(run_id = %self.run_id, key = %key, "4K item supersedes already flushed entry");
                let slot = self.push(item);
                self.counters.upgrades += 1;
                self.seen_movies.record(key, is_4k, slot);
            }
            MovieVerdict::Duplicate => {
                self.counters.duplicates_skipped += 1;
                RECORDS_SKIPPED.with_label_values(&["duplicate"]).inc();
            }
        }
    }

    fn push(&mut self, item: ClassifiedItem) -> BatchSlot {
        let slot = BatchSlot {
            batch: self.batch_seq,
            index: self.batch.len(),
        };
        self.batch.push(item);
        self.counters.items_found += 1;

        if self.counters.items_found % 10_000 == 0 {
            tracing::info!(
                run_id = %self.run_id,
                items_found = self.counters.items_found,
                lines = self.counters.processed,
                "Parsed {} items...",
                self.counters.items_found
            );
        }

        slot
    }

    /// Deliver the current batch and start a new one
    async fn send_batch(&mut self) -> Result<(), RunError> {
        let capacity = self.config.batch_size_for(self.params.large_scale);
        let items = std::mem::replace(&mut self.batch, Vec::with_capacity(capacity));
        let count = items.len() as u64;

        self.emit(ParseEvent::Batch {
            items,
            lines_processed: self.counters.processed,
            total_lines: self.counters.total_lines,
        })
        .await?;

        self.batch_seq += 1;
        self.batches_sent += 1;
        BATCHES_FLUSHED.inc();
        ITEMS_EMITTED.inc_by(count);
        Ok(())
    }

    /// Full batch: deliver it, then yield before scanning resumes
    async fn flush(&mut self) -> Result<(), RunError> {
        self.transition(EngineState::Flushing);
        self.send_batch().await?;
        tokio::time::sleep(self.config.batch_delay).await;
        self.transition(EngineState::Scanning);
        Ok(())
    }
}

/// Handle to a spawned parse run.
///
/// Dropping the handle (or calling [`ParseRun::cancel`]) aborts the run
/// immediately; a batch in flight may be lost.
pub struct ParseRun {
    run_id: Uuid,
    events: mpsc::Receiver<ParseEvent>,
    task: JoinHandle<()>,
}

impl ParseRun {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Next notification; `None` once the run has ended
    pub async fn next_event(&mut self) -> Option<ParseEvent> {
        self.events.recv().await
    }

    /// Hard cancellation
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Notifications as a stream. The run is cancelled when the stream is dropped.
    pub fn into_stream(mut self) -> impl Stream<Item = ParseEvent> {
        async_stream::stream! {
            while let Some(event) = self.next_event().await {
                yield event;
            }
        }
    }
}

impl Drop for ParseRun {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Start an independent run for one upload on its own task
pub fn spawn_run(config: EngineConfig, upload: PlaylistUpload, params: RunParams) -> ParseRun {
    let run_id = Uuid::new_v4();
    let (tx, rx) = mpsc::channel(config.event_channel_capacity.max(1));

    RUNS_STARTED
        .with_label_values(&[&params.default_media_kind.to_string()])
        .inc();

    let task = tokio::spawn(async move {
        let file_name = upload.file_name.clone();
        let engine = IngestEngine::new(run_id, config, params, tx);

        match engine.run_upload(upload).await {
            Ok(summary) => {
                let outcome = if summary.capped { "capped" } else { "done" };
                RUNS_FINISHED.with_label_values(&[outcome]).inc();
                tracing::info!(
                    run_id = %summary.run_id,
                    file = %file_name,
                    outcome,
                    items = summary.counters.items_found,
                    lines = summary.counters.processed,
                    "Parse run finished"
                );
            }
            Err(RunError::Cancelled) => {
                RUNS_FINISHED.with_label_values(&["cancelled"]).inc();
                tracing::info!(run_id = %run_id, file = %file_name, "Parse run cancelled by consumer");
            }
            Err(RunError::Failed(e)) => {
                RUNS_FINISHED.with_label_values(&["error"]).inc();
                tracing::error!(run_id = %run_id, file = %file_name, "Parse run failed: {}", e);
            }
        }
    });

    ParseRun {
        run_id,
        events: rx,
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::source::tests::zip_with;
    use std::time::Duration;

    fn test_config() -> EngineConfig {
        EngineConfig {
            batch_delay: Duration::ZERO,
            ..EngineConfig::default()
        }
    }

    fn entry(title: &str, url: &str) -> String {
        format!("#EXTINF:-1 group-title=\"Action\",{}\n{}\n", title, url)
    }

    async fn run_text(
        text: &str,
        config: EngineConfig,
        default_kind: MediaKind,
    ) -> (Vec<ParseEvent>, Result<RunSummary, RunError>) {
        let (tx, mut rx) = mpsc::channel(16);
        let params = RunParams::for_kind(default_kind, Some(false));
        let engine = IngestEngine::new(Uuid::new_v4(), config, params, tx);

        let collect = async {
            let mut events = Vec::new();
            while let Some(event) = rx.recv().await {
                events.push(event);
            }
            events
        };

        let (result, events) = tokio::join!(engine.run(text), collect);
        (events, result)
    }

    fn batches(events: &[ParseEvent]) -> Vec<Vec<ClassifiedItem>> {
        events
            .iter()
            .filter_map(|e| match e {
                ParseEvent::Batch { items, .. } => Some(items.clone()),
                _ => None,
            })
            .collect()
    }

    fn emitted(events: &[ParseEvent]) -> Vec<ClassifiedItem> {
        batches(events).into_iter().flatten().collect()
    }

    #[tokio::test]
    async fn test_4k_wins_when_first() {
        let text = "#EXTINF:-1 tvg-logo=\"a.png\" group-title=\"Action\",Movie A (4K)\nhttp://x/1\n#EXTINF:-1 group-title=\"Action\",Movie A\nhttp://x/2";
        let (events, result) = run_text(text, test_config(), MediaKind::Movie).await;

        let items = emitted(&events);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Movie A (4K)");
        assert_eq!(items[0].url, "http://x/1");
        assert_eq!(items[0].image_url, "a.png");
        assert_eq!(items[0].id, "Movie A (4K)::http://x/1");
        assert_eq!(result.unwrap().counters.duplicates_skipped, 1);
    }

    #[tokio::test]
    async fn test_4k_wins_when_last() {
        let text = "#EXTINF:-1 group-title=\"Action\",Movie A\nhttp://x/2\n#EXTINF:-1 tvg-logo=\"a.png\" group-title=\"Action\",Movie A (4K)\nhttp://x/1";
        let (events, result) = run_text(text, test_config(), MediaKind::Movie).await;

        let items = emitted(&events);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Movie A (4K)");
        assert_eq!(items[0].url, "http://x/1");

        let summary = result.unwrap();
        assert_eq!(summary.counters.items_found, 1);
        assert_eq!(summary.counters.upgrades, 1);
        assert!(matches!(events.last(), Some(ParseEvent::Done { total_items_found: 1, .. })));
    }

    #[tokio::test]
    async fn test_4k_after_flush_is_appended() {
        let config = EngineConfig {
            batch_size: 1,
            ..test_config()
        };
        let text = format!(
            "{}{}{}",
            entry("Movie A", "http://x/1"),
            entry("Movie A 4K", "http://x/2"),
            entry("Movie A (4K)", "http://x/3"),
        );
        let (events, _) = run_text(&text, config, MediaKind::Movie).await;

        let titles: Vec<String> = emitted(&events).into_iter().map(|i| i.title).collect();
        assert_eq!(titles, vec!["Movie A", "Movie A 4K"]);
    }

    #[tokio::test]
    async fn test_duplicate_movies_are_dropped() {
        let text = format!(
            "{}{}{}",
            entry("Matrix", "http://x/1"),
            entry("  MATRIX ", "http://x/2"),
            entry("Matrix Reloaded", "http://x/3"),
        );
        let (events, result) = run_text(&text, test_config(), MediaKind::Movie).await;

        let urls: Vec<String> = emitted(&events).into_iter().map(|i| i.url).collect();
        assert_eq!(urls, vec!["http://x/1", "http://x/3"]);
        assert_eq!(result.unwrap().counters.duplicates_skipped, 1);
    }

    #[tokio::test]
    async fn test_series_pass_through() {
        let text = format!(
            "{}{}{}",
            entry("Show Name S01E01", "http://x/1"),
            entry("Show Name S01E02", "http://x/2"),
            entry("Show Name S01E02", "http://x/3"),
        );
        let (events, _) = run_text(&text, test_config(), MediaKind::Movie).await;

        let items = emitted(&events);
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|i| i.media_kind == MediaKind::Series));
        assert_eq!(items[0].title, "Show Name S01E01");
        assert_eq!(items[1].title, "Show Name S01E02");
    }

    #[tokio::test]
    async fn test_default_kind_series_skips_dedup() {
        let text = format!("{}{}", entry("Novela", "http://x/1"), entry("Novela", "http://x/2"));
        let (events, _) = run_text(&text, test_config(), MediaKind::Series).await;
        assert_eq!(emitted(&events).len(), 2);
    }

    #[tokio::test]
    async fn test_adult_content_excluded() {
        let text = format!(
            "{}{}#EXTINF:-1 group-title=\"Adultos\",Inocente\nhttp://x/3\n",
            entry("Hot XXX Night", "http://x/1"),
            entry("Matrix", "http://x/2"),
        );
        let (events, result) = run_text(&text, test_config(), MediaKind::Movie).await;

        let items = emitted(&events);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Matrix");

        let summary = result.unwrap();
        assert_eq!(summary.counters.items_found, 1);
        assert_eq!(summary.counters.adult_skipped, 2);
    }

    #[tokio::test]
    async fn test_metadata_without_url_at_end() {
        let (events, result) =
            run_text("#EXTM3U\n#EXTINF:-1,Lonely Movie", test_config(), MediaKind::Movie).await;

        assert!(emitted(&events).is_empty());
        assert!(matches!(events.last(), Some(ParseEvent::Done { total_items_found: 0, .. })));
        assert_eq!(result.unwrap().counters.incomplete_dropped, 1);
    }

    #[tokio::test]
    async fn test_batch_size_bound_and_order() {
        let config = EngineConfig {
            batch_size: 3,
            ..test_config()
        };
        let text: String = (1..=10)
            .map(|n| entry(&format!("Show S01E{:02}", n), &format!("http://x/{}", n)))
            .collect();
        let (events, result) = run_text(&text, config, MediaKind::Movie).await;

        let sizes: Vec<usize> = batches(&events).iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![3, 3, 3, 1]);

        let urls: Vec<String> = emitted(&events).into_iter().map(|i| i.url).collect();
        let expected: Vec<String> = (1..=10).map(|n| format!("http://x/{}", n)).collect();
        assert_eq!(urls, expected);
        assert_eq!(result.unwrap().batches, 4);
    }

    #[tokio::test]
    async fn test_large_scale_uses_smaller_batches() {
        let config = EngineConfig {
            batch_size: 5,
            large_scale_batch_size: 2,
            ..test_config()
        };
        let text: String = (1..=5)
            .map(|n| entry(&format!("Show S01E{:02}", n), &format!("http://x/{}", n)))
            .collect();

        let (tx, mut rx) = mpsc::channel(16);
        let params = RunParams::for_kind(MediaKind::Series, None);
        let engine = IngestEngine::new(Uuid::new_v4(), config, params, tx);
        let collect = async {
            let mut events = Vec::new();
            while let Some(event) = rx.recv().await {
                events.push(event);
            }
            events
        };
        let (_, events) = tokio::join!(engine.run(&text), collect);

        let sizes: Vec<usize> = batches(&events).iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_hard_cap() {
        let config = EngineConfig {
            batch_size: 3,
            max_items_per_run: 4,
            ..test_config()
        };
        let text: String = (1..=10)
            .map(|n| entry(&format!("Movie {}", n), &format!("http://x/{}", n)))
            .collect();
        let (events, result) = run_text(&text, config, MediaKind::Movie).await;

        assert_eq!(emitted(&events).len(), 4);
        assert!(matches!(events.last(), Some(ParseEvent::Done { total_items_found: 4, .. })));

        let summary = result.unwrap();
        assert!(summary.capped);
        assert!(summary.counters.processed < summary.counters.total_lines);
    }

    #[tokio::test]
    async fn test_progress_cadence() {
        let config = EngineConfig {
            progress_every_lines: 4,
            ..test_config()
        };
        let text: String = (1..=5)
            .map(|n| entry(&format!("Movie {}", n), &format!("http://x/{}", n)))
            .collect();
        let (events, result) = run_text(&text, config, MediaKind::Movie).await;

        let progress_lines: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                ParseEvent::Progress { lines_processed, total_lines, .. } => {
                    assert_eq!(*total_lines, 10);
                    Some(*lines_processed)
                }
                _ => None,
            })
            .collect();
        assert_eq!(progress_lines, vec![0, 4, 8]);

        let summary = result.unwrap();
        assert_eq!(summary.counters.processed, summary.counters.total_lines);
    }

    #[tokio::test]
    async fn test_long_line_is_fatal() {
        let config = EngineConfig {
            max_line_bytes: 64,
            ..test_config()
        };
        let text = format!("{}#EXTINF:-1,{}\nhttp://x/2\n", entry("Matrix", "http://x/1"), "a".repeat(100));
        let (events, result) = run_text(&text, config, MediaKind::Movie).await;

        assert!(matches!(events.last(), Some(ParseEvent::Error { .. })));
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert!(matches!(
            result,
            Err(RunError::Failed(IngestError::LineTooLong { line: 3, .. }))
        ));
    }

    #[tokio::test]
    async fn test_dropped_receiver_cancels() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let engine = IngestEngine::new(Uuid::new_v4(), test_config(), RunParams::default(), tx);
        let result = engine.run(&entry("Matrix", "http://x/1")).await;
        assert!(matches!(result, Err(RunError::Cancelled)));
    }

    #[test]
    fn test_seen_movies_index() {
        let mut index = SeenMoviesIndex::default();
        assert_eq!(index.len(), 0);
        assert_eq!(index.check("matrix", false, 0), MovieVerdict::Accept);

        index.record("matrix".to_string(), false, BatchSlot { batch: 0, index: 2 });
        assert_eq!(index.check("matrix", false, 0), MovieVerdict::Duplicate);
        assert_eq!(index.check("matrix", true, 0), MovieVerdict::Upgrade { replace: Some(2) });
        assert_eq!(index.check("matrix", true, 1), MovieVerdict::Upgrade { replace: None });

        index.record("matrix".to_string(), true, BatchSlot { batch: 1, index: 0 });
        assert_eq!(index.check("matrix", true, 1), MovieVerdict::Duplicate);
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn test_spawn_run_plain_upload() {
        let text = format!("#EXTM3U\n{}{}", entry("Matrix", "http://x/1"), entry("Show S01E01", "http://x/2"));
        let upload = PlaylistUpload::new("lista.m3u", text.into_bytes());
        let run = spawn_run(test_config(), upload, RunParams::for_kind(MediaKind::Movie, None));

        let events: Vec<ParseEvent> = futures::StreamExt::collect(run.into_stream()).await;

        assert!(matches!(events.first(), Some(ParseEvent::Progress { .. })));
        assert_eq!(emitted(&events).len(), 2);
        assert!(matches!(events.last(), Some(ParseEvent::Done { total_items_found: 2, .. })));
    }

    #[tokio::test]
    async fn test_spawn_run_zip_without_playlist() {
        let upload = PlaylistUpload::new("lista.zip", zip_with(&[("leia-me.txt", "nada")]));
        let mut run = spawn_run(test_config(), upload, RunParams::default());

        let mut events = Vec::new();
        while let Some(event) = run.next_event().await {
            events.push(event);
        }

        assert_eq!(events.len(), 2);
        match &events[1] {
            ParseEvent::Error { message } => assert_eq!(message, "ZIP sem arquivo M3U"),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_spawn_run_cancel() {
        let config = EngineConfig {
            batch_size: 10,
            batch_delay: Duration::from_millis(5),
            event_channel_capacity: 1,
            ..EngineConfig::default()
        };
        let text: String = (1..=50_000)
            .map(|n| entry(&format!("Show S01E{}", n % 99), &format!("http://x/{}", n)))
            .collect();
        let upload = PlaylistUpload::new("lista.m3u", text.into_bytes());
        let mut run = spawn_run(config, upload, RunParams::default());

        assert!(run.next_event().await.is_some());
        run.cancel();

        let mut saw_done = false;
        while let Some(event) = run.next_event().await {
            saw_done |= matches!(event, ParseEvent::Done { .. });
        }
        assert!(!saw_done);
    }
}
