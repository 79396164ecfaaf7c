//! Filesystem watching for the marker file.
//!
//! A watch is a cancellable stream: dropping the [`MarkerEvents`] stream
//! stops the watch and releases whatever the backend holds.

pub mod notify_watcher;

pub use notify_watcher::{NotifyWatcher, WatchMode};

use crate::error::watch::WatchError;

use std::path::{Path, PathBuf};

use futures_util::stream::BoxStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    Created,
    Changed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: WatchEventKind,
}

pub type MarkerEvents = BoxStream<'static, Result<WatchEvent, WatchError>>;

pub trait FileWatcher: Send + Sync {
    /// Start observing `path` for creation or change.
    ///
    /// The path does not need to exist yet. Only events for `path` itself
    /// are yielded.
    fn watch(&self, path: &Path) -> Result<MarkerEvents, WatchError>;
}
