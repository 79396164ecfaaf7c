use client_core::FileWatcher;
use client_core::error::watch::WatchError;
use client_core::watcher::{NotifyWatcher, WatchMode};

use std::time::Duration;

use futures_util::StreamExt;
use tokio::time::timeout as TokioTimeout;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);
const QUIET_PERIOD: Duration = Duration::from_millis(300);

/// **VALUE**: Verifies that a marker that does not exist yet can be watched and that its
/// creation is reported.
///
/// **WHY THIS MATTERS**: OS watch APIs refuse missing paths. The watcher has to watch the
/// parent directory instead; if that regresses, every fresh launch hangs until timeout.
#[tokio::test]
async fn given_missing_marker_when_created_then_event_is_yielded() {
    // GIVEN: A watch on a file that does not exist yet
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("http");
    let mut events = NotifyWatcher::new(WatchMode::Native).watch(&marker).unwrap();

    // WHEN: The file is created
    std::fs::write(&marker, "9090").unwrap();

    // THEN: An event for that path arrives
    let event = TokioTimeout(EVENT_TIMEOUT, events.next())
        .await
        .expect("no event before timeout")
        .expect("stream ended")
        .expect("watch error");
    assert_eq!(event.path.file_name(), marker.file_name());
}

/// **VALUE**: Verifies that sibling files in the cache directory do not wake the watcher.
///
/// **BUG THIS CATCHES**: Would catch if name filtering is removed and temp files written by
/// the server trigger a read of a marker that is not there yet.
#[tokio::test]
async fn given_sibling_file_when_created_then_no_event_is_yielded() {
    // GIVEN: A watch on the marker
    let dir = tempfile::tempdir().unwrap();
    let mut events = NotifyWatcher::new(WatchMode::Native)
        .watch(&dir.path().join("http"))
        .unwrap();

    // WHEN: A different file appears
    std::fs::write(dir.path().join("server.log"), "booting").unwrap();

    // THEN: Nothing is yielded
    assert!(TokioTimeout(QUIET_PERIOD, events.next()).await.is_err());
}

#[tokio::test]
async fn given_poll_mode_when_marker_created_then_event_is_yielded() {
    // GIVEN: A polling watch
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("http");
    let watcher = NotifyWatcher::new(WatchMode::Poll {
        interval: Duration::from_millis(20),
    });
    let mut events = watcher.watch(&marker).unwrap();

    // WHEN: The marker is created
    std::fs::write(&marker, "9090").unwrap();

    // THEN: The poller reports it
    let event = TokioTimeout(EVENT_TIMEOUT, events.next()).await.unwrap();
    assert!(matches!(event, Some(Ok(_))));
}

/// **VALUE**: Verifies that a marker whose directory does not exist cannot be watched.
///
/// **WHY THIS MATTERS**: The coordinator creates the cache dir first; if it ever did not, the
/// failure must be an explicit Install error instead of a silent watch on nothing.
#[tokio::test]
async fn given_missing_parent_dir_when_watched_then_returns_install_error() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("missing").join("http");

    let result = NotifyWatcher::new(WatchMode::Native).watch(&marker);

    assert!(matches!(result, Err(WatchError::Install { .. })));
}

#[test]
fn given_bare_file_name_when_watched_then_returns_install_error() {
    let result = NotifyWatcher::default().watch(std::path::Path::new("http"));

    assert!(matches!(result, Err(WatchError::Install { .. })));
}
