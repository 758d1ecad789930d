//! Dedup tracker for collection and product URLs
//!
//! One tracker lives for exactly one crawl run. It is shared by every page
//! handler, so marking a URL is a single atomic insert per set: when two
//! handlers race on the same new URL, exactly one of them wins.

use std::collections::HashSet;
use std::sync::Mutex;

/// Which of the two tracked sets a URL belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupSet {
    /// Collection (category) pages already queued
    Collections,
    /// Product detail pages already queued
    Products,
}

/// Process-lifetime sets of already-queued collection and product URLs
#[derive(Debug, Default)]
pub struct DedupTracker {
    collections: Mutex<HashSet<String>>,
    products: Mutex<HashSet<String>>,
}

impl DedupTracker {
    /// Creates an empty tracker for a new crawl run
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `url` as seen in `set`
    ///
    /// Returns true only the first time a URL is seen. Callers mark a URL
    /// before enqueueing it, so a failed enqueue is never retried this run.
    pub fn check_and_mark(&self, set: DedupSet, url: &str) -> bool {
        let mut seen = self
            .set(set)
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        seen.insert(url.to_string())
    }

    /// Returns true if `url` has already been marked in `set`
    pub fn contains(&self, set: DedupSet, url: &str) -> bool {
        self.set(set)
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(url)
    }

    /// Number of URLs marked in `set`
    pub fn len(&self, set: DedupSet) -> usize {
        self.set(set)
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn set(&self, set: DedupSet) -> &Mutex<HashSet<String>> {
        match set {
            DedupSet::Collections => &self.collections,
            DedupSet::Products => &self.products,
        }
    }
}
