use crate::error::AppError;

use client_core::error::StartupError;
use client_core::error::config::ConfigError;
use client_core::error::connection::ConnectionError;

use common::ErrorLocation;

use std::error::Error;
use std::io::{Error as IoError, ErrorKind};
use std::path::Path;

/// **VALUE**: Verifies that a startup failure keeps its cause reachable from the app error.
///
/// **WHY THIS MATTERS**: The CLI prints only the top-level error. If the chain is cut, a
/// permission problem on the cache dir shows up as a bare "Core Error".
///
/// **BUG THIS CATCHES**: Would catch if the `From<StartupError>` conversion stringifies the
/// error instead of keeping it as the source.
#[test]
fn given_startup_error_when_converted_then_source_chain_is_preserved() {
    // GIVEN: A cache-dir failure
    let startup = StartupError::cache_dir(
        Path::new("/cache/project"),
        IoError::new(ErrorKind::PermissionDenied, "denied"),
    );

    // WHEN: Converting into the app error
    let err: AppError = startup.into();

    // THEN: Core variant, and the io error is two levels down
    assert!(matches!(err, AppError::Core { .. }));
    let core = err.source().unwrap();
    let io = core.source().unwrap().downcast_ref::<IoError>().unwrap();
    assert_eq!(io.kind(), ErrorKind::PermissionDenied);
    assert!(err.to_string().contains("Cache Dir Error"));
}

#[test]
fn given_config_error_when_converted_then_becomes_core_variant() {
    let config = ConfigError::ValidationError {
        location: ErrorLocation::caller(),
        reason: "Project name cannot be empty".to_string(),
    };

    let err: AppError = config.into();

    assert!(matches!(err, AppError::Core { .. }));
    assert!(err.to_string().contains("Project name cannot be empty"));
}

#[test]
fn given_connection_error_when_converted_then_becomes_session_variant() {
    let connection = ConnectionError::Send {
        message: "socket closed".to_string(),
        location: ErrorLocation::caller(),
    };

    let err: AppError = connection.into();

    assert!(matches!(err, AppError::Session { .. }));
    assert!(err.to_string().starts_with("Session Error: Send Error: socket closed"));
}
