//! Prometheus metrics definitions.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

use crate::watcher::WatcherStatsSnapshot;

/// Documents upserted by the reconciler.
pub static DOCUMENTS_INDEXED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "dirsearch_documents_indexed_total",
        "Total number of document upserts"
    )
    .expect("metric definition is valid")
});

/// Documents deleted by the reconciler.
pub static DOCUMENTS_REMOVED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "dirsearch_documents_removed_total",
        "Total number of document deletions"
    )
    .expect("metric definition is valid")
});

/// Watch and reconcile failures.
pub static WATCH_ERRORS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "dirsearch_watch_errors_total",
        "Total number of watch and reconcile failures"
    )
    .expect("metric definition is valid")
});

/// Directories registered with the OS backend.
pub static WATCHED_DIRS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "dirsearch_watched_directories",
        "Number of directories currently watched"
    )
    .expect("metric definition is valid")
});

/// 1 while the watch loop runs.
pub static WATCHER_UP: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("dirsearch_watcher_up", "Whether the watch loop is running")
        .expect("metric definition is valid")
});

/// Documents in the index.
pub static INDEX_DOCUMENTS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "dirsearch_index_documents",
        "Number of documents in the index"
    )
    .expect("metric definition is valid")
});

/// Search requests by outcome.
pub static SEARCH_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "dirsearch_search_requests_total",
        "Total number of search requests",
        &["outcome"]
    )
    .expect("metric definition is valid")
});

/// Search latency histogram.
pub static SEARCH_LATENCY: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "dirsearch_search_duration_seconds",
        "Search latency in seconds",
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("metric definition is valid")
});

/// Initialize all metrics (call once at startup).
pub fn init_metrics() {
    // Access lazy statics to register them
    let _ = &*DOCUMENTS_INDEXED;
    let _ = &*DOCUMENTS_REMOVED;
    let _ = &*WATCH_ERRORS;
    let _ = &*WATCHED_DIRS;
    let _ = &*WATCHER_UP;
    let _ = &*INDEX_DOCUMENTS;
    let _ = &*SEARCH_REQUESTS;
    let _ = &*SEARCH_LATENCY;

    tracing::debug!("Prometheus metrics initialized");
}

/// Bring watcher-derived metrics up to date with a stats snapshot.
///
/// The watcher keeps its own atomics, so counters only ever move forward
/// to the snapshot value.
#[allow(clippy::cast_possible_wrap)]
pub fn record_watcher(snapshot: &WatcherStatsSnapshot, num_docs: u64) {
    advance(&DOCUMENTS_INDEXED, snapshot.documents_indexed);
    advance(&DOCUMENTS_REMOVED, snapshot.documents_removed);
    advance(&WATCH_ERRORS, snapshot.errors);
    WATCHED_DIRS.set(snapshot.watched_dirs as i64);
    WATCHER_UP.set(i64::from(snapshot.watching));
    INDEX_DOCUMENTS.set(num_docs as i64);
}

fn advance(counter: &IntCounter, target: u64) {
    let current = counter.get();
    if target > current {
        counter.inc_by(target - current);
    }
}
