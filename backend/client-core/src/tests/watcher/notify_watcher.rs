// Unit tests for notify event filtering

use crate::watcher::WatchEventKind;
use crate::watcher::notify_watcher::marker_event;

use std::ffi::OsString;
use std::path::PathBuf;

use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind};

fn event(kind: EventKind, path: &str) -> Event {
    Event::new(kind).add_path(PathBuf::from(path))
}

fn marker_name() -> OsString {
    OsString::from("http")
}

/// **VALUE**: Verifies that creation of the marker maps to a Created event.
#[test]
fn given_create_event_for_marker_when_filtered_then_returns_created() {
    let raw = event(EventKind::Create(CreateKind::File), "/cache/http");

    let filtered = marker_event(&raw, &marker_name()).unwrap();

    assert_eq!(filtered.kind, WatchEventKind::Created);
    assert_eq!(filtered.path, PathBuf::from("/cache/http"));
}

/// **VALUE**: Verifies that a rename into place counts as a marker event.
///
/// **WHY THIS MATTERS**: Servers publish the marker atomically with write-then-rename. On
/// Linux that arrives as a Modify(Name) event, not a Create. Dropping it would leave the
/// coordinator waiting until its timeout.
#[test]
fn given_rename_into_marker_when_filtered_then_returns_changed() {
    let raw = event(
        EventKind::Modify(ModifyKind::Name(RenameMode::To)),
        "/cache/http",
    );

    let filtered = marker_event(&raw, &marker_name()).unwrap();

    assert_eq!(filtered.kind, WatchEventKind::Changed);
}

/// **VALUE**: Verifies that other files in the cache directory are ignored.
///
/// **BUG THIS CATCHES**: Would catch if filtering is dropped; the server writes other state
/// into the same directory and any of it would trigger a premature marker read.
#[test]
fn given_event_for_sibling_file_when_filtered_then_ignored() {
    let raw = event(EventKind::Create(CreateKind::File), "/cache/http.tmp");

    assert!(marker_event(&raw, &marker_name()).is_none());
}

#[test]
fn given_remove_or_access_event_when_filtered_then_ignored() {
    let removed = event(EventKind::Remove(RemoveKind::File), "/cache/http");
    let accessed = event(EventKind::Access(AccessKind::Any), "/cache/http");

    assert!(marker_event(&removed, &marker_name()).is_none());
    assert!(marker_event(&accessed, &marker_name()).is_none());
}
