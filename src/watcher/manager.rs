//! Watch set maintenance and the event loop.
//!
//! The manager owns the set of registered directories. It is moved onto the
//! watch thread by [`WatchManager::start`], so the set is only ever touched
//! from one place and needs no lock.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use walkdir::WalkDir;

use super::backend::{BackendChannels, WatchBackend};
use super::events::{NormalizedEvent, Op, RawEvent};
use super::stats::WatcherStats;
use crate::error::WatcherError;
use crate::Result;

/// Receiver of normalized events.
pub trait EventSink: Send + Sync {
    fn handle(&self, event: NormalizedEvent);

    /// Called once the initial walk of `root` has emitted every file.
    fn tree_walked(&self, _root: &Path) {}
}

/// Keeps one watch per directory under the root and turns raw
/// notifications into normalized events.
pub struct WatchManager<B: WatchBackend> {
    backend: B,
    watched: HashSet<PathBuf>,
    root: PathBuf,
    excluded: Vec<PathBuf>,
    sink: Arc<dyn EventSink>,
    stats: Arc<WatcherStats>,
}

impl<B: WatchBackend> WatchManager<B> {
    /// Create a manager with an empty watch set.
    pub fn new(backend: B, sink: Arc<dyn EventSink>, stats: Arc<WatcherStats>) -> Self {
        Self {
            backend,
            watched: HashSet::new(),
            root: PathBuf::new(),
            excluded: Vec::new(),
            sink,
            stats,
        }
    }

    /// Skip `path` and everything below it, during the walk and afterwards.
    pub fn exclude(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        tracing::debug!(path = %path.display(), "Excluding path from watch");
        self.excluded.push(path);
    }

    /// Canonical root, empty until [`register_root`](Self::register_root).
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directories currently registered with the backend.
    #[must_use]
    pub fn watched(&self) -> &HashSet<PathBuf> {
        &self.watched
    }

    /// Walk the root, watching every directory and emitting `Created` for
    /// every other entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be resolved, walked or watched.
    /// Failures below the root are logged and skipped.
    pub fn register_root(&mut self, root: impl AsRef<Path>) -> Result<()> {
        let root = root.as_ref();
        let root = root.canonicalize().map_err(|e| WatcherError::WalkFailed {
            path: root.display().to_string(),
            reason: e.to_string(),
        })?;

        self.root.clone_from(&root);
        self.register_tree(&root)?;
        self.sink.tree_walked(&root);

        tracing::info!(
            root = %root.display(),
            dirs = self.watched.len(),
            "Registered watch tree"
        );
        Ok(())
    }

    /// Walk `dir`, registering directories and emitting `Created` for files.
    ///
    /// Only failures on `dir` itself are returned.
    fn register_tree(&mut self, dir: &Path) -> Result<()> {
        let excluded = self.excluded.clone();
        let walker = WalkDir::new(dir)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !is_under(&excluded, entry.path()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(WatcherError::WalkFailed {
                        path: dir.display().to_string(),
                        reason: e.to_string(),
                    }
                    .into());
                }
                Err(e) => {
                    WatcherStats::incr(&self.stats.errors);
                    tracing::warn!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                if let Err(e) = self.add_watch(entry.path()) {
                    if entry.depth() == 0 {
                        return Err(e);
                    }
                    WatcherStats::incr(&self.stats.errors);
                    tracing::warn!(path = %entry.path().display(), error = %e, "Failed to watch directory");
                }
            } else {
                self.sink.handle(NormalizedEvent::created(entry.path()));
            }
        }

        Ok(())
    }

    /// Register one directory. Registering twice is a no-op.
    fn add_watch(&mut self, dir: &Path) -> Result<()> {
        if self.watched.contains(dir) {
            return Ok(());
        }
        self.backend.watch(dir)?;
        self.watched.insert(dir.to_path_buf());
        self.stats.set_watched_dirs(self.watched.len());
        tracing::trace!(path = %dir.display(), "Watching directory");
        Ok(())
    }

    /// Drop `path` and every registered directory below it.
    ///
    /// The path may already be gone, so nothing here looks at the
    /// filesystem.
    fn remove_watch_tree(&mut self, path: &Path) {
        let doomed: Vec<PathBuf> = self
            .watched
            .iter()
            .filter(|dir| dir.starts_with(path))
            .cloned()
            .collect();

        for dir in doomed {
            self.watched.remove(&dir);
            // The OS usually drops the watch itself once the directory is gone.
            if let Err(e) = self.backend.unwatch(&dir) {
                tracing::debug!(path = %dir.display(), error = %e, "Unwatch failed");
            }
        }
        self.stats.set_watched_dirs(self.watched.len());
    }

    /// Classify one raw notification. Every set bit is handled in turn.
    pub fn handle_raw(&mut self, raw: RawEvent) {
        let RawEvent { path, op } = raw;
        WatcherStats::incr(&self.stats.events_received);

        if is_under(&self.excluded, &path) {
            return;
        }

        if op.contains(Op::CREATE) {
            let metadata = match std::fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Created path already gone");
                    return;
                }
            };

            if metadata.is_dir() {
                // Anything written before the watch landed is only visible to a walk.
                if let Err(e) = self.register_tree(&path) {
                    WatcherStats::incr(&self.stats.errors);
                    tracing::warn!(path = %path.display(), error = %e, "Failed to register new directory");
                }
            } else {
                self.sink.handle(NormalizedEvent::created(&path));
            }
        }

        if op.contains(Op::WRITE) {
            self.sink.handle(NormalizedEvent::modified(&path));
        }

        if op.intersects(Op::REMOVE | Op::RENAME) {
            self.remove_watch_tree(&path);
            self.sink.handle(NormalizedEvent::removed(&path));
        }

        if op.contains(Op::CHMOD) {
            tracing::trace!(path = %path.display(), "Ignoring permission change");
        }
    }
}

impl<B: WatchBackend + 'static> WatchManager<B> {
    /// Walk and register `root`, then run the event loop on its own thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be registered or the thread
    /// cannot be spawned.
    pub fn start(mut self, root: impl AsRef<Path>, channels: BackendChannels) -> Result<WatchHandle> {
        self.register_root(root)?;

        let stats = Arc::clone(&self.stats);
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);

        stats.set_watching(true);
        let spawned = std::thread::Builder::new()
            .name("dirsearch-watch".to_string())
            .spawn(move || self.run(&channels, &stop_rx));

        let thread = match spawned {
            Ok(thread) => thread,
            Err(e) => {
                stats.set_watching(false);
                return Err(e.into());
            }
        };

        Ok(WatchHandle {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
            stats,
        })
    }

    fn run(mut self, channels: &BackendChannels, stop_rx: &Receiver<()>) {
        tracing::info!(root = %self.root.display(), "Watch loop started");

        loop {
            let keep_going = crossbeam_channel::select! {
                recv(channels.events) -> msg => match msg {
                    Ok(event) => {
                        for raw in RawEvent::from_notify(event) {
                            self.handle_raw(raw);
                        }
                        true
                    }
                    Err(_) => {
                        tracing::info!("Event channel closed");
                        false
                    }
                },
                recv(channels.errors) -> msg => {
                    match msg {
                        Ok(e) => {
                            WatcherStats::incr(&self.stats.errors);
                            tracing::error!(error = %e, "Watch backend failed, index will go stale");
                        }
                        Err(_) => tracing::info!("Error channel closed"),
                    }
                    false
                },
                recv(stop_rx) -> _ => {
                    tracing::info!("Watch loop stop requested");
                    false
                },
            };

            if !keep_going {
                break;
            }
        }

        self.stats.set_watching(false);
        tracing::info!(root = %self.root.display(), "Watch loop stopped");
    }
}

/// Whether `path` is one of `prefixes` or below one.
fn is_under(prefixes: &[PathBuf], path: &Path) -> bool {
    prefixes.iter().any(|prefix| path.starts_with(prefix))
}

/// Handle to a running watch loop. Dropping it stops the loop.
pub struct WatchHandle {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
    stats: Arc<WatcherStats>,
}

impl WatchHandle {
    /// Stats shared with the loop and the reconciler.
    #[must_use]
    pub fn stats(&self) -> &Arc<WatcherStats> {
        &self.stats
    }

    /// Whether the loop thread is still alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Signal the loop and wait for it to exit.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            // A full or closed channel both mean the loop is leaving.
            let _ = tx.try_send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Watch thread panicked");
            }
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
