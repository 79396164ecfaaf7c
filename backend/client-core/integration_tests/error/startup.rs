use client_core::error::StartupError;
use client_core::error::connection::ConnectionError;
use client_core::error::launch::LaunchError;
use client_core::error::watch::WatchError;
use common::ErrorLocation;

use std::error::Error;
use std::io::Error as IoError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// **VALUE**: Verifies that the cache-dir failure keeps the original io error as its source.
///
/// **WHY THIS MATTERS**: Callers decide between "fix permissions" and "disk full" from the
/// io error kind. Flattening it to a string would hide that.
///
/// **BUG THIS CATCHES**: Would catch if `#[source]` is removed from `CacheDir` or the helper
/// starts wrapping the io error in a message.
#[test]
fn given_cache_dir_error_when_source_requested_then_io_kind_is_preserved() {
    // GIVEN: A cache-dir error built by the helper
    let err = StartupError::cache_dir(
        Path::new("/cache/project"),
        IoError::new(ErrorKind::PermissionDenied, "denied"),
    );

    // WHEN: Walking to the source
    let source = err.source().expect("CacheDir should carry a source");

    // THEN: Same kind as the original
    let io = source.downcast_ref::<IoError>().unwrap();
    assert_eq!(io.kind(), ErrorKind::PermissionDenied);
    assert_eq!(err.error_category(), "cache_dir");
}

/// **VALUE**: Verifies that helper constructors record the caller's location, not their own.
///
/// **BUG THIS CATCHES**: Would catch if `#[track_caller]` is removed from the helpers; every
/// error would then point into `error/startup.rs`.
#[test]
fn given_helper_constructor_when_formatted_then_location_points_at_caller() {
    // GIVEN: A marker-read error built here
    let err = StartupError::marker_read(Path::new("/cache/http"), "marker is empty");

    // WHEN: Formatting
    let error_string = err.to_string();

    // THEN: The location names this test file
    assert!(error_string.starts_with("Marker Read Error: /cache/http: marker is empty"));
    assert!(error_string.contains("startup.rs"));
    assert!(!error_string.contains("src/error/startup.rs"));
}

#[test]
fn given_startup_failed_when_source_requested_then_returns_launch_error() {
    // GIVEN: A launch failure wrapped as startup failure
    let launch = LaunchError::Validation {
        message: "Server program is empty".to_string(),
        location: ErrorLocation::caller(),
    };
    let err = StartupError::startup_failed("Server launch failed", launch);

    // WHEN: Walking to the source
    let source = err.source().unwrap();

    // THEN: The launch error is intact
    assert!(source.downcast_ref::<LaunchError>().is_some());
    assert_eq!(err.error_category(), "startup_failed");
}

#[test]
fn given_timeout_error_when_formatted_then_names_marker_and_duration() {
    let err = StartupError::startup_timeout(Path::new("/cache/http"), Duration::from_secs(5));

    let error_string = err.to_string();

    assert!(error_string.contains("/cache/http"));
    assert!(error_string.contains("5s"));
    assert_eq!(err.error_category(), "startup_timeout");
}

#[test]
fn given_watch_error_when_converted_then_becomes_watch_variant() {
    // GIVEN: A closed watch stream
    let watch = WatchError::Closed {
        path: PathBuf::from("/cache/http"),
        location: ErrorLocation::caller(),
    };

    // WHEN: Converting with `?`-style From
    let err: StartupError = watch.into();

    // THEN: Watch variant with the original as source
    assert!(matches!(err, StartupError::Watch { .. }));
    assert!(err.source().unwrap().downcast_ref::<WatchError>().is_some());
}

#[test]
fn given_connection_error_when_converted_then_becomes_connection_variant() {
    let connection = ConnectionError::Closed {
        message: "server went away".to_string(),
        location: ErrorLocation::caller(),
    };

    let err: StartupError = connection.into();

    assert!(matches!(err, StartupError::Connection { .. }));
    assert!(err.to_string().contains("server went away"));
    assert_eq!(err.error_category(), "connection");
}
