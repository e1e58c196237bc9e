//! Directory watching and index reconciliation.
//!
//! This module provides:
//! - Per-directory registration with the OS notification backend
//! - Translation of raw notifications into created/modified/removed events
//! - Path inclusion filtering
//! - Reconciliation of events against the index

mod backend;
mod events;
mod filter;
mod manager;
mod reconciler;
mod stats;

pub use backend::{BackendChannels, NotifyBackend, WatchBackend};
pub use events::{ChangeKind, NormalizedEvent, Op, RawEvent};
pub use filter::{InclusionFilter, PatternSyntax};
pub use manager::{EventSink, WatchHandle, WatchManager};
pub use reconciler::{Outcome, Reconciler};
pub use stats::{WatcherStats, WatcherStatsSnapshot};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::WatcherError;
use crate::index::DocumentMutator;
use crate::Result;

/// Index `root` into `mutator` and keep following it on a background thread.
///
/// Paths under any of `excluded` are neither indexed nor watched.
///
/// # Errors
///
/// Returns an error if the root cannot be resolved, walked or watched, or
/// if the OS backend cannot be created.
pub fn watch_tree(
    root: impl AsRef<Path>,
    filter: InclusionFilter,
    mutator: Arc<dyn DocumentMutator>,
    excluded: &[PathBuf],
) -> Result<WatchHandle> {
    let root = root.as_ref();
    let root = root.canonicalize().map_err(|e| WatcherError::WalkFailed {
        path: root.display().to_string(),
        reason: e.to_string(),
    })?;

    let stats = WatcherStats::new();
    let reconciler = Reconciler::new(&root, filter, mutator, Arc::clone(&stats));
    let (backend, channels) = NotifyBackend::new()?;

    let mut manager = WatchManager::new(backend, Arc::new(reconciler), stats);
    for path in excluded {
        manager.exclude(path);
    }

    manager.start(&root, channels)
}
