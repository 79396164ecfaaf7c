use client_core::error::CoreError;
use client_core::error::config::ConfigError;
use client_core::error::connection::ConnectionError;
use client_core::error::StartupError;

use common::ErrorLocation;

use thiserror::Error;

/// Errors surfaced by the command-line client.
#[derive(Debug, Error)]
pub enum AppError {
    /// Error from this app (log setup, stdin)
    #[error("Client Error: {message} {location}")]
    Client {
        message: String,
        location: ErrorLocation,
    },

    /// Error from client-core while loading the project or starting the server
    #[error("Core Error: {source} {location}")]
    Core {
        location: ErrorLocation,
        #[source]
        source: CoreError,
    },

    /// The live connection failed after startup
    #[error("Session Error: {source} {location}")]
    Session {
        location: ErrorLocation,
        #[source]
        source: ConnectionError,
    },
}

impl From<ConfigError> for AppError {
    #[track_caller]
    fn from(source: ConfigError) -> Self {
        AppError::Core {
            location: ErrorLocation::caller(),
            source: source.into(),
        }
    }
}

impl From<StartupError> for AppError {
    #[track_caller]
    fn from(source: StartupError) -> Self {
        AppError::Core {
            location: ErrorLocation::caller(),
            source: source.into(),
        }
    }
}

impl From<ConnectionError> for AppError {
    #[track_caller]
    fn from(source: ConnectionError) -> Self {
        AppError::Session {
            location: ErrorLocation::caller(),
            source,
        }
    }
}
