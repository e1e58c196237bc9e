//! OS notification backend.
//!
//! Watches are registered one directory at a time; nothing is recursive.

use std::path::Path;

use crossbeam_channel::{Receiver, Sender};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::WatcherError;
use crate::Result;

/// Capacity of the notification channels. The backend thread blocks when
/// the watch loop falls this far behind.
const CHANNEL_CAPACITY: usize = 4096;

/// Registration of individual directories with an OS primitive.
pub trait WatchBackend: Send {
    /// Start receiving notifications for direct children of `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the primitive refuses the path.
    fn watch(&mut self, path: &Path) -> Result<()>;

    /// Stop receiving notifications for `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the path was not registered with the primitive.
    fn unwatch(&mut self, path: &Path) -> Result<()>;
}

/// Receiving ends of the backend's event and error streams.
pub struct BackendChannels {
    pub events: Receiver<notify::Event>,
    pub errors: Receiver<notify::Error>,
}

impl BackendChannels {
    /// Create a connected pair of senders and channels.
    #[must_use]
    pub fn pair() -> (Sender<notify::Event>, Sender<notify::Error>, Self) {
        let (event_tx, events) = crossbeam_channel::bounded(CHANNEL_CAPACITY);
        let (error_tx, errors) = crossbeam_channel::bounded(CHANNEL_CAPACITY);
        (event_tx, error_tx, Self { events, errors })
    }
}

/// Backend over the platform's recommended notify watcher.
pub struct NotifyBackend {
    watcher: RecommendedWatcher,
}

impl NotifyBackend {
    /// Create the watcher and the channels its notifications arrive on.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform watcher cannot be created.
    pub fn new() -> Result<(Self, BackendChannels)> {
        let (event_tx, error_tx, channels) = BackendChannels::pair();

        let watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
            let delivered = match result {
                Ok(event) => event_tx.send(event).is_ok(),
                Err(e) => error_tx.send(e).is_ok(),
            };
            if !delivered {
                tracing::trace!("Watch loop gone, dropping notification");
            }
        })
        .map_err(|e| WatcherError::Backend(e.to_string()))?;

        Ok((Self { watcher }, channels))
    }
}

impl WatchBackend for NotifyBackend {
    fn watch(&mut self, path: &Path) -> Result<()> {
        self.watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| WatcherError::watch_failed(path, e).into())
    }

    fn unwatch(&mut self, path: &Path) -> Result<()> {
        self.watcher
            .unwatch(path)
            .map_err(|e| WatcherError::watch_failed(path, e).into())
    }
}
