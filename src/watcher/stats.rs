//! Counters for watching and reconciling.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Statistics shared between the watch loop, the reconciler and readers.
#[derive(Debug, Default)]
pub struct WatcherStats {
    pub events_received: AtomicU64,
    pub events_filtered: AtomicU64,
    pub documents_indexed: AtomicU64,
    pub documents_removed: AtomicU64,
    pub watched_dirs: AtomicU64,
    pub errors: AtomicU64,
    watching: AtomicBool,
}

impl WatcherStats {
    /// Create new stats tracker.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Whether the watch loop is currently running.
    ///
    /// Turns false once the loop exits, after which the index no longer
    /// tracks the tree.
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.watching.load(Ordering::Acquire)
    }

    pub(crate) fn set_watching(&self, watching: bool) {
        self.watching.store(watching, Ordering::Release);
    }

    pub(crate) fn set_watched_dirs(&self, count: usize) {
        self.watched_dirs.store(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Get snapshot of current stats.
    #[must_use]
    pub fn snapshot(&self) -> WatcherStatsSnapshot {
        WatcherStatsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_filtered: self.events_filtered.load(Ordering::Relaxed),
            documents_indexed: self.documents_indexed.load(Ordering::Relaxed),
            documents_removed: self.documents_removed.load(Ordering::Relaxed),
            watched_dirs: self.watched_dirs.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            watching: self.is_watching(),
        }
    }
}

/// Snapshot of watcher stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct WatcherStatsSnapshot {
    pub events_received: u64,
    pub events_filtered: u64,
    pub documents_indexed: u64,
    pub documents_removed: u64,
    pub watched_dirs: u64,
    pub errors: u64,
    pub watching: bool,
}
