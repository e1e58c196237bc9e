//! Applies normalized events to the index.

use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::sync::Arc;

use super::events::{ChangeKind, NormalizedEvent};
use super::filter::InclusionFilter;
use super::manager::EventSink;
use super::stats::WatcherStats;
use crate::index::{DocumentMutator, IndexDocument};

/// What handling an event did to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The path failed the inclusion filter.
    Filtered,
    /// The document was upserted.
    Indexed,
    /// The document and any documents below it were deleted (or were
    /// already absent).
    Removed,
    /// The file could not be read; the index was left alone.
    Skipped,
    /// The index rejected the write.
    Failed,
}

/// Drives index mutations from file events.
///
/// Documents are keyed by their path relative to `root`; paths outside the
/// root keep their full form.
pub struct Reconciler {
    root: PathBuf,
    filter: InclusionFilter,
    mutator: Arc<dyn DocumentMutator>,
    stats: Arc<WatcherStats>,
}

impl Reconciler {
    /// Create a reconciler. `root` should be canonical so it prefixes the
    /// paths the watch manager reports.
    pub fn new(
        root: impl Into<PathBuf>,
        filter: InclusionFilter,
        mutator: Arc<dyn DocumentMutator>,
        stats: Arc<WatcherStats>,
    ) -> Self {
        Self {
            root: root.into(),
            filter,
            mutator,
            stats,
        }
    }

    /// Document id for a path.
    #[must_use]
    pub fn document_id(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }

    /// Index or remove the document for `path`.
    pub fn index_doc(&self, path: &Path, remove: bool) -> Outcome {
        let event = if remove {
            NormalizedEvent::removed(path)
        } else {
            NormalizedEvent::modified(path)
        };
        self.handle_event(&event)
    }

    /// Apply one event.
    pub fn handle_event(&self, event: &NormalizedEvent) -> Outcome {
        let id = self.document_id(&event.path);

        match event.kind {
            ChangeKind::Removed => self.remove(&id),
            ChangeKind::Created | ChangeKind::Modified => {
                if !self.filter.matches(&id) {
                    return self.filtered(&id);
                }
                self.upsert(&event.path, id)
            }
        }
    }

    /// Delete every document whose file is gone or no longer passes the
    /// filter. Returns how many were deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be listed or written.
    pub fn prune_missing(&self) -> crate::Result<usize> {
        let stale: Vec<String> = self
            .mutator
            .ids_with_prefix("")?
            .into_iter()
            .filter(|id| !self.filter.matches(id) || !self.root.join(id).is_file())
            .collect();

        self.mutator.delete_many(&stale)?;
        WatcherStats::add(&self.stats.documents_removed, stale.len());
        Ok(stale.len())
    }

    fn filtered(&self, id: &str) -> Outcome {
        WatcherStats::incr(&self.stats.events_filtered);
        tracing::trace!(id = %id, "Path excluded by filter");
        Outcome::Filtered
    }

    /// The path may have been a directory, so documents below it go too.
    /// Nothing here looks at the filesystem.
    fn remove(&self, id: &str) -> Outcome {
        let below = format!("{id}{MAIN_SEPARATOR}");
        let mut doomed = match self.mutator.ids_with_prefix(&below) {
            Ok(ids) => ids,
            Err(e) => {
                WatcherStats::incr(&self.stats.errors);
                tracing::warn!(id = %id, error = %e, "Failed to list documents below path");
                return Outcome::Failed;
            }
        };

        if self.filter.matches(id) {
            doomed.push(id.to_string());
        } else if doomed.is_empty() {
            return self.filtered(id);
        }

        match self.mutator.delete_many(&doomed) {
            Ok(()) => {
                WatcherStats::add(&self.stats.documents_removed, doomed.len());
                tracing::debug!(id = %id, count = doomed.len(), "Removed documents");
                Outcome::Removed
            }
            Err(e) => {
                WatcherStats::incr(&self.stats.errors);
                tracing::warn!(id = %id, error = %e, "Failed to delete document");
                Outcome::Failed
            }
        }
    }

    fn upsert(&self, path: &Path, id: String) -> Outcome {
        // Directories, vanished files and non-UTF-8 content all land here.
        let body = match std::fs::read_to_string(path) {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable path");
                return Outcome::Skipped;
            }
        };

        match self.mutator.upsert(IndexDocument::new(id.clone(), body)) {
            Ok(()) => {
                WatcherStats::incr(&self.stats.documents_indexed);
                tracing::debug!(id = %id, "Indexed document");
                Outcome::Indexed
            }
            Err(e) => {
                WatcherStats::incr(&self.stats.errors);
                tracing::warn!(id = %id, error = %e, "Failed to index document");
                Outcome::Failed
            }
        }
    }
}

impl EventSink for Reconciler {
    fn handle(&self, event: NormalizedEvent) {
        self.handle_event(&event);
    }

    fn tree_walked(&self, root: &Path) {
        match self.prune_missing() {
            Ok(0) => {}
            Ok(count) => {
                tracing::info!(root = %root.display(), count, "Pruned documents for missing files");
            }
            Err(e) => {
                WatcherStats::incr(&self.stats.errors);
                tracing::warn!(root = %root.display(), error = %e, "Failed to prune stale documents");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexStore;
    use crate::search::QueryPlan;
    use crate::watcher::PatternSyntax;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        tmp: TempDir,
        store: IndexStore,
        reconciler: Reconciler,
        stats: Arc<WatcherStats>,
    }

    fn fixture(pattern: &str) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        let store = IndexStore::open_in_memory().unwrap();
        let stats = WatcherStats::new();
        let filter = InclusionFilter::new(pattern, PatternSyntax::Regex).unwrap();
        let reconciler = Reconciler::new(
            root,
            filter,
            Arc::new(store.clone()),
            Arc::clone(&stats),
        );
        Fixture {
            tmp,
            store,
            reconciler,
            stats,
        }
    }

    impl Fixture {
        fn write(&self, name: &str, body: &str) -> PathBuf {
            let path = self.tmp.path().canonicalize().unwrap().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&path, body).unwrap();
            path
        }

        fn ids_for(&self, word: &str) -> Vec<String> {
            let mut ids: Vec<String> = self
                .store
                .search(&QueryPlan::FreeText(word.to_string()), 100)
                .unwrap()
                .into_iter()
                .map(|h| h.id)
                .collect();
            ids.sort();
            ids
        }
    }

    #[test]
    fn test_document_id_is_root_relative() {
        let fx = fixture("");
        let path = fx.write("notes/a.md", "x");
        assert_eq!(fx.reconciler.document_id(&path), "notes/a.md");
        assert_eq!(
            fx.reconciler.document_id(Path::new("/elsewhere/b.md")),
            "/elsewhere/b.md"
        );
    }

    #[test]
    fn test_created_indexes_file() {
        let fx = fixture("");
        let path = fx.write("a.md", "bleve indexing is easy");

        let outcome = fx.reconciler.handle_event(&NormalizedEvent::created(&path));
        assert_eq!(outcome, Outcome::Indexed);
        assert_eq!(fx.ids_for("indexing"), vec!["a.md"]);
    }

    #[test]
    fn test_applying_created_twice_is_idempotent() {
        let fx = fixture("");
        let path = fx.write("a.md", "bleve indexing is easy");

        fx.reconciler.handle_event(&NormalizedEvent::created(&path));
        fx.reconciler.handle_event(&NormalizedEvent::created(&path));

        assert_eq!(fx.store.num_docs(), 1);
        assert_eq!(fx.ids_for("indexing"), vec!["a.md"]);
    }

    #[test]
    fn test_modified_replaces_content() {
        let fx = fixture("");
        let path = fx.write("a.md", "first draft");
        fx.reconciler.handle_event(&NormalizedEvent::created(&path));

        fx.write("a.md", "second revision");
        fx.reconciler.handle_event(&NormalizedEvent::modified(&path));

        assert!(fx.ids_for("draft").is_empty());
        assert_eq!(fx.ids_for("revision"), vec!["a.md"]);
    }

    #[test]
    fn test_removed_never_indexed_succeeds() {
        let fx = fixture("");
        let path = fx.tmp.path().join("ghost.md");

        let outcome = fx.reconciler.handle_event(&NormalizedEvent::removed(&path));
        assert_eq!(outcome, Outcome::Removed);
        assert_eq!(fx.stats.snapshot().errors, 0);
    }

    #[test]
    fn test_removed_deletes_without_file() {
        let fx = fixture("");
        let path = fx.write("a.md", "bleve indexing is easy");
        fx.reconciler.handle_event(&NormalizedEvent::created(&path));
        fs::remove_file(&path).unwrap();

        let outcome = fx.reconciler.handle_event(&NormalizedEvent::removed(&path));
        assert_eq!(outcome, Outcome::Removed);
        assert!(fx.ids_for("indexing").is_empty());
    }

    #[test]
    fn test_removed_directory_deletes_documents_below_it() {
        let fx = fixture(r"\.md$");
        for name in ["sub/b.md", "sub/deeper/c.md", "subway.md", "a.md"] {
            let path = fx.write(name, "shared body");
            fx.reconciler.handle_event(&NormalizedEvent::created(&path));
        }
        let sub = fx.tmp.path().canonicalize().unwrap().join("sub");
        fs::remove_dir_all(&sub).unwrap();

        let outcome = fx.reconciler.handle_event(&NormalizedEvent::removed(&sub));

        assert_eq!(outcome, Outcome::Removed);
        assert_eq!(fx.ids_for("shared"), vec!["a.md", "subway.md"]);
        assert_eq!(fx.stats.snapshot().documents_removed, 2);
        assert_eq!(fx.stats.snapshot().events_filtered, 0);
    }

    #[test]
    fn test_prune_drops_documents_for_missing_files() {
        let fx = fixture("");
        let gone = fx.write("gone.md", "shared body");
        let kept = fx.write("sub/kept.md", "shared body");
        fx.reconciler.handle_event(&NormalizedEvent::created(&gone));
        fx.reconciler.handle_event(&NormalizedEvent::created(&kept));
        fs::remove_file(&gone).unwrap();

        assert_eq!(fx.reconciler.prune_missing().unwrap(), 1);
        assert_eq!(fx.ids_for("shared"), vec!["sub/kept.md"]);
        assert_eq!(fx.reconciler.prune_missing().unwrap(), 0);
    }

    #[test]
    fn test_prune_drops_documents_the_filter_now_rejects() {
        let fx = fixture("");
        let path = fx.write("notes.txt", "shared body");
        fx.reconciler.handle_event(&NormalizedEvent::created(&path));

        let narrowed = Reconciler::new(
            fx.tmp.path().canonicalize().unwrap(),
            InclusionFilter::new(r"\.md$", PatternSyntax::Regex).unwrap(),
            Arc::new(fx.store.clone()),
            WatcherStats::new(),
        );

        assert_eq!(narrowed.prune_missing().unwrap(), 1);
        assert_eq!(fx.store.num_docs(), 0);
    }

    #[test]
    fn test_filtered_paths_never_mutate() {
        let fx = fixture(r"\.md$");
        let path = fx.write("notes.txt", "bleve indexing is easy");

        for event in [
            NormalizedEvent::created(&path),
            NormalizedEvent::modified(&path),
            NormalizedEvent::removed(&path),
        ] {
            assert_eq!(fx.reconciler.handle_event(&event), Outcome::Filtered);
        }

        assert_eq!(fx.store.num_docs(), 0);
        assert_eq!(fx.stats.snapshot().events_filtered, 3);
    }

    #[test]
    fn test_filter_does_not_remove_existing_doc_for_other_path() {
        let fx = fixture(r"\.md$");
        let kept = fx.write("a.md", "kept body");
        fx.reconciler.handle_event(&NormalizedEvent::created(&kept));

        let other = fx.write("a.txt", "ignored");
        fx.reconciler.handle_event(&NormalizedEvent::removed(&other));

        assert_eq!(fx.ids_for("kept"), vec!["a.md"]);
    }

    #[test]
    fn test_unreadable_paths_are_skipped() {
        let fx = fixture("");
        let dir = fx.tmp.path().canonicalize().unwrap().join("subdir");
        fs::create_dir(&dir).unwrap();

        assert_eq!(
            fx.reconciler.handle_event(&NormalizedEvent::modified(&dir)),
            Outcome::Skipped
        );
        assert_eq!(
            fx.reconciler
                .handle_event(&NormalizedEvent::created(dir.join("vanished.md"))),
            Outcome::Skipped
        );
        assert_eq!(fx.store.num_docs(), 0);
    }

    #[test]
    fn test_index_doc_entrypoint() {
        let fx = fixture("");
        let path = fx.write("a.md", "entrypoint body");

        assert_eq!(fx.reconciler.index_doc(&path, false), Outcome::Indexed);
        assert_eq!(fx.ids_for("entrypoint"), vec!["a.md"]);

        assert_eq!(fx.reconciler.index_doc(&path, true), Outcome::Removed);
        assert!(fx.ids_for("entrypoint").is_empty());
    }
}
