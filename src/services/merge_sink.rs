use chrono::{DateTime, Utc};
use std::collections::{HashSet, VecDeque};

use crate::models::{ClassifiedItem, ContentStats, MediaKind};

/// Result of merging one batch into the preview
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub added: usize,
    pub duplicates: usize,
    pub evicted: usize,
}

/// Bounded, id-deduplicated accumulation of emitted batches.
///
/// Holds at most `max_items`; when full the oldest items go first.
#[derive(Debug)]
pub struct PreviewCollection {
    items: VecDeque<ClassifiedItem>,
    ids: HashSet<String>,
    max_items: usize,
}

impl PreviewCollection {
    pub fn new(max_items: usize) -> Self {
        Self {
            items: VecDeque::new(),
            ids: HashSet::new(),
            max_items: max_items.max(1),
        }
    }

    /// Merge a batch. Items whose id is already present (from earlier
    /// batches or earlier in this one) are skipped.
    pub fn merge_batch(&mut self, batch: Vec<ClassifiedItem>) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();

        for item in batch {
            if !self.ids.insert(item.id.clone()) {
                outcome.duplicates += 1;
                continue;
            }
            self.items.push_back(item);
            outcome.added += 1;
        }

        while self.items.len() > self.max_items {
            if let Some(oldest) = self.items.pop_front() {
                self.ids.remove(&oldest.id);
                outcome.evicted += 1;
            }
        }

        if outcome.evicted > 0 {
            tracing::debug!(evicted = outcome.evicted, max = self.max_items, "Preview full, oldest items evicted");
        }

        outcome
    }

    pub fn items(&self) -> impl Iterator<Item = &ClassifiedItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.ids.clear();
    }

    pub fn stats(&self) -> ContentStats {
        ContentStats::from_items(self.items.iter())
    }
}

/// The published catalogue, merged from previews by id only
#[derive(Debug, Default)]
pub struct PublishedContent {
    items: Vec<ClassifiedItem>,
    ids: HashSet<String>,
    last_updated: Option<DateTime<Utc>>,
}

impl PublishedContent {
    /// Rebuild from persisted items (first occurrence of an id wins)
    pub fn from_items(items: Vec<ClassifiedItem>, last_updated: Option<DateTime<Utc>>) -> Self {
        let mut content = Self {
            items: Vec::with_capacity(items.len()),
            ids: HashSet::with_capacity(items.len()),
            last_updated,
        };
        for item in items {
            if content.ids.insert(item.id.clone()) {
                content.items.push(item);
            }
        }
        content
    }

    /// Merge every preview item not yet published. Returns how many were new.
    pub fn publish(&mut self, preview: &PreviewCollection) -> usize {
        let mut added = 0;
        for item in preview.items() {
            if self.ids.insert(item.id.clone()) {
                self.items.push(item.clone());
                added += 1;
            }
        }
        self.last_updated = Some(Utc::now());
        added
    }

    /// True when the preview holds at least one item not published yet
    pub fn has_unpublished(&self, preview: &PreviewCollection) -> bool {
        preview.items().any(|item| !self.ids.contains(&item.id))
    }

    pub fn items(&self) -> impl Iterator<Item = &ClassifiedItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn stats(&self) -> ContentStats {
        ContentStats::from_items(self.items.iter())
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.ids.clear();
        self.last_updated = Some(Utc::now());
    }
}

/// Page through items with an optional media kind filter.
/// Returns the page and the total number of matching items.
pub fn paginate<'a>(
    items: impl Iterator<Item = &'a ClassifiedItem>,
    media_kind: Option<MediaKind>,
    offset: usize,
    limit: usize,
) -> (Vec<ClassifiedItem>, usize) {
    let mut page = Vec::with_capacity(limit.min(1024));
    let mut total = 0;

    for item in items.filter(|i| media_kind.map_or(true, |k| i.media_kind == k)) {
        if total >= offset && page.len() < limit {
            page.push(item.clone());
        }
        total += 1;
    }

    (page, total)
}
