//! File system event types and translation from backend notifications.

#![allow(clippy::missing_const_for_fn)]

use std::path::{Path, PathBuf};

use bitflags::bitflags;
use notify::event::{ModifyKind, RenameMode};
use notify::EventKind;

bitflags! {
    /// Operations reported for a path. Several may be set at once.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct Op: u8 {
        const CREATE = 0b0000_0001;
        const WRITE  = 0b0000_0010;
        const REMOVE = 0b0000_0100;
        const RENAME = 0b0000_1000;
        const CHMOD  = 0b0001_0000;
    }
}

/// A single-path notification with its operation bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub path: PathBuf,
    pub op: Op,
}

impl RawEvent {
    /// Create a raw event.
    pub fn new(path: impl Into<PathBuf>, op: Op) -> Self {
        Self {
            path: path.into(),
            op,
        }
    }

    /// Split a backend notification into per-path raw events.
    ///
    /// Access notifications and unrecognised kinds produce nothing.
    #[must_use]
    pub fn from_notify(event: notify::Event) -> Vec<Self> {
        let notify::Event { kind, paths, .. } = event;

        match kind {
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                // paths are [from, to]
                let mut paths = paths.into_iter();
                let mut out = Vec::with_capacity(2);
                if let Some(from) = paths.next() {
                    out.push(Self::new(from, Op::RENAME));
                }
                if let Some(to) = paths.next() {
                    out.push(Self::new(to, Op::CREATE));
                }
                out
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Any | RenameMode::Other)) => paths
                .into_iter()
                .map(|path| {
                    let op = ambiguous_rename_op(&path);
                    Self::new(path, op)
                })
                .collect(),
            kind => {
                let op = op_for_kind(kind);
                if op.is_empty() {
                    return Vec::new();
                }
                paths.into_iter().map(|path| Self::new(path, op)).collect()
            }
        }
    }
}

/// Map an unambiguous backend kind to operation bits.
fn op_for_kind(kind: EventKind) -> Op {
    match kind {
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Op::CREATE,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Op::RENAME,
        EventKind::Modify(ModifyKind::Metadata(_)) => Op::CHMOD,
        EventKind::Modify(_) | EventKind::Any => Op::WRITE,
        EventKind::Remove(_) => Op::REMOVE,
        EventKind::Access(_) | EventKind::Other => Op::empty(),
    }
}

/// Some backends report both sides of a rename with the same kind. The side
/// that still exists is the new name.
fn ambiguous_rename_op(path: &Path) -> Op {
    if path.symlink_metadata().is_ok() {
        Op::CREATE
    } else {
        Op::RENAME
    }
}

/// Normalized change kinds handed to the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

/// A resolved path and what happened to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl NormalizedEvent {
    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Created,
        }
    }

    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Modified,
        }
    }

    pub fn removed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Removed,
        }
    }

    /// Check if this event removes the document.
    #[must_use]
    pub fn is_removal(&self) -> bool {
        self.kind == ChangeKind::Removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind};

    fn event(kind: EventKind, paths: &[&str]) -> notify::Event {
        paths
            .iter()
            .fold(notify::Event::new(kind), |ev, p| ev.add_path(PathBuf::from(p)))
    }

    #[test]
    fn test_create_maps_to_create() {
        let raw = RawEvent::from_notify(event(EventKind::Create(CreateKind::File), &["/r/a.md"]));
        assert_eq!(raw, vec![RawEvent::new("/r/a.md", Op::CREATE)]);
    }

    #[test]
    fn test_data_change_maps_to_write() {
        let raw = RawEvent::from_notify(event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/r/a.md"],
        ));
        assert_eq!(raw, vec![RawEvent::new("/r/a.md", Op::WRITE)]);
    }

    #[test]
    fn test_metadata_maps_to_chmod() {
        let raw = RawEvent::from_notify(event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
            &["/r/a.md"],
        ));
        assert_eq!(raw, vec![RawEvent::new("/r/a.md", Op::CHMOD)]);
    }

    #[test]
    fn test_remove_maps_to_remove() {
        let raw = RawEvent::from_notify(event(EventKind::Remove(RemoveKind::Folder), &["/r/d"]));
        assert_eq!(raw, vec![RawEvent::new("/r/d", Op::REMOVE)]);
    }

    #[test]
    fn test_rename_sides() {
        let from = RawEvent::from_notify(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/r/old.md"],
        ));
        assert_eq!(from, vec![RawEvent::new("/r/old.md", Op::RENAME)]);

        let to = RawEvent::from_notify(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/r/new.md"],
        ));
        assert_eq!(to, vec![RawEvent::new("/r/new.md", Op::CREATE)]);
    }

    #[test]
    fn test_rename_both_splits_paths() {
        let raw = RawEvent::from_notify(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/r/old.md", "/r/new.md"],
        ));
        assert_eq!(
            raw,
            vec![
                RawEvent::new("/r/old.md", Op::RENAME),
                RawEvent::new("/r/new.md", Op::CREATE),
            ]
        );
    }

    #[test]
    fn test_ambiguous_rename_of_vanished_path() {
        let raw = RawEvent::from_notify(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Any)),
            &["/definitely/not/here.md"],
        ));
        assert_eq!(raw, vec![RawEvent::new("/definitely/not/here.md", Op::RENAME)]);
    }

    #[test]
    fn test_access_is_ignored() {
        let raw = RawEvent::from_notify(event(EventKind::Access(AccessKind::Any), &["/r/a.md"]));
        assert!(raw.is_empty());
    }

    #[test]
    fn test_op_bits_combine() {
        let op = Op::CREATE | Op::WRITE;
        assert!(op.contains(Op::CREATE));
        assert!(op.contains(Op::WRITE));
        assert!(!op.intersects(Op::REMOVE | Op::RENAME));
    }

    #[test]
    fn test_normalized_constructors() {
        assert_eq!(NormalizedEvent::created("/a").kind, ChangeKind::Created);
        assert_eq!(NormalizedEvent::modified("/a").kind, ChangeKind::Modified);
        assert!(NormalizedEvent::removed("/a").is_removal());
    }
}
