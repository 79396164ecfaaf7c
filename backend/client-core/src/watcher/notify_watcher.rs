use crate::error::watch::WatchError;
use crate::watcher::{FileWatcher, MarkerEvents, WatchEvent, WatchEventKind};

use common::ErrorLocation;

use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::unfold;
use log::{debug, trace, warn};
use notify::{
    Config, Event, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher,
    recommended_watcher,
};
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    /// The platform's notification API (inotify, FSEvents, ReadDirectoryChangesW).
    Native,
    /// Periodic directory scans, for filesystems without native notifications.
    Poll { interval: Duration },
}

impl WatchMode {
    pub fn poll() -> Self {
        WatchMode::Poll {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl Default for WatchMode {
    fn default() -> Self {
        WatchMode::Native
    }
}

/// [`FileWatcher`] backed by the `notify` crate.
///
/// A file that does not exist yet cannot be watched directly, so the parent
/// directory is watched non-recursively and events are filtered by file name.
#[derive(Debug, Clone, Default)]
pub struct NotifyWatcher {
    mode: WatchMode,
}

enum Backend {
    Native(RecommendedWatcher),
    Poll(PollWatcher),
}

impl Backend {
    fn watch(&mut self, dir: &Path) -> notify::Result<()> {
        match self {
            Backend::Native(watcher) => watcher.watch(dir, RecursiveMode::NonRecursive),
            Backend::Poll(watcher) => watcher.watch(dir, RecursiveMode::NonRecursive),
        }
    }
}

impl NotifyWatcher {
    pub fn new(mode: WatchMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> WatchMode {
        self.mode
    }
}

impl FileWatcher for NotifyWatcher {
    fn watch(&self, path: &Path) -> Result<MarkerEvents, WatchError> {
        let (dir, file_name) = split_target(path)?;
        let (tx, rx) = unbounded_channel();
        let handler = event_handler(tx, file_name);

        let mut backend = match self.mode {
            WatchMode::Native => recommended_watcher(handler).map(Backend::Native),
            WatchMode::Poll { interval } => {
                PollWatcher::new(handler, Config::default().with_poll_interval(interval))
                    .map(Backend::Poll)
            }
        }
        .map_err(|e| install_error(path, "Failed to create watcher", e))?;

        backend
            .watch(dir)
            .map_err(|e| install_error(path, "Failed to watch directory", e))?;

        debug!(
            "Watching {} for {} ({:?})",
            dir.display(),
            path.display(),
            self.mode
        );

        // The backend lives inside the stream state; dropping the stream unwatches.
        let events = unfold((backend, rx), |(backend, mut rx)| async move {
            rx.recv().await.map(|item| (item, (backend, rx)))
        });

        Ok(events.boxed())
    }
}

#[track_caller]
fn split_target(path: &Path) -> Result<(&Path, OsString), WatchError> {
    let file_name = path.file_name().map(|name| name.to_os_string());
    let dir = path.parent().filter(|dir| !dir.as_os_str().is_empty());

    match (dir, file_name) {
        (Some(dir), Some(file_name)) => Ok((dir, file_name)),
        _ => Err(WatchError::Install {
            path: path.to_path_buf(),
            message: "Path has no parent directory or file name".to_string(),
            location: ErrorLocation::caller(),
            source: notify::Error::path_not_found().add_path(path.to_path_buf()),
        }),
    }
}

#[track_caller]
fn install_error(path: &Path, context: &str, source: notify::Error) -> WatchError {
    WatchError::Install {
        path: path.to_path_buf(),
        message: format!("{context}: {source}"),
        location: ErrorLocation::caller(),
        source,
    }
}

fn event_handler(
    tx: UnboundedSender<Result<WatchEvent, WatchError>>,
    file_name: OsString,
) -> impl FnMut(notify::Result<Event>) + Send + 'static {
    move |result| {
        let item = match result {
            Ok(event) => match marker_event(&event, &file_name) {
                Some(marker) => Ok(marker),
                None => {
                    trace!("Ignoring {:?} on {:?}", event.kind, event.paths);
                    return;
                }
            },
            Err(e) => {
                warn!("File watcher error: {e}");
                Err(WatchError::Backend {
                    message: e.to_string(),
                    location: ErrorLocation::caller(),
                })
            }
        };

        // The receiver is gone once the coordinator has stopped listening.
        let _ = tx.send(item);
    }
}

pub(crate) fn marker_event(event: &Event, file_name: &OsString) -> Option<WatchEvent> {
    let kind = match event.kind {
        EventKind::Create(_) => WatchEventKind::Created,
        EventKind::Modify(_) | EventKind::Any => WatchEventKind::Changed,
        _ => return None,
    };

    event
        .paths
        .iter()
        .find(|path| path.file_name() == Some(file_name.as_os_str()))
        .map(|path| WatchEvent {
            path: path.clone(),
            kind,
        })
}
