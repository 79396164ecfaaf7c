use client_core::error::launch::LaunchError;
use common::ErrorLocation;

use std::error::Error;
use std::io::Error as IoError;
use std::io::ErrorKind;
use std::panic::Location;

/// **VALUE**: Verifies that `LaunchError::Spawn` includes file/line/column location tracking.
///
/// **WHY THIS MATTERS**: A missing or non-executable server binary is the most common startup
/// failure. The location tells developers which launch path produced it.
///
/// **BUG THIS CATCHES**: Would catch if the location field is dropped from the Display format.
#[test]
#[track_caller]
fn given_spawn_error_when_formatted_then_includes_location() {
    // GIVEN: A Spawn error with location
    let io_err = IoError::new(ErrorKind::NotFound, "binary not found");
    let err = LaunchError::Spawn {
        message: "Failed to launch analysis-server".to_string(),
        location: ErrorLocation::from(Location::caller()),
        source: Box::new(io_err),
    };

    // WHEN: Formatting the error as string
    let error_string = err.to_string();

    // THEN: Should include error type, message, and file location
    assert!(error_string.contains("Spawn Error"));
    assert!(error_string.contains("Failed to launch analysis-server"));
    assert!(error_string.contains("launch.rs"));
}

#[test]
fn given_spawn_error_when_source_requested_then_returns_io_error() {
    // GIVEN: A Spawn error wrapping an io error
    let err = LaunchError::Spawn {
        message: "Failed to launch".to_string(),
        location: ErrorLocation::caller(),
        source: Box::new(IoError::new(ErrorKind::PermissionDenied, "denied")),
    };

    // WHEN: Walking to the source
    let source = err.source().expect("Spawn should carry a source");

    // THEN: The io error is reachable and keeps its kind
    let io = source
        .downcast_ref::<IoError>()
        .expect("source should be an io::Error");
    assert_eq!(io.kind(), ErrorKind::PermissionDenied);
}

#[test]
fn given_validation_error_when_formatted_then_has_no_source() {
    let err = LaunchError::Validation {
        message: "Server program is empty".to_string(),
        location: ErrorLocation::caller(),
    };

    assert!(err.to_string().starts_with("Validation Error: Server program is empty"));
    assert!(err.source().is_none());
}
