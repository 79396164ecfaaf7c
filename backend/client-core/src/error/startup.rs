//! Error types for the startup coordinator.
//!
//! - Every failure the coordinator can surface is a variant here, including
//!   launcher and watcher failures that arrive while waiting for the marker
//! - Underlying errors stay reachable through `source()`
//! - All variants include ErrorLocation, captured with `#[track_caller]`

use crate::error::connection::ConnectionError;
use crate::error::watch::WatchError;

use common::ErrorLocation;

use std::error::Error as StdError;
use std::io::Error as IoError;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum StartupError {
    /// The cache directory could not be created. Nothing was watched or launched.
    #[error("Cache Dir Error: {path}: {source} {location}")]
    CacheDir {
        path: PathBuf,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },

    #[error("Marker Read Error: {path}: {message} {location}")]
    MarkerRead {
        path: PathBuf,
        message: String,
        location: ErrorLocation,
    },

    /// The launcher failed before the server published its marker.
    #[error("Startup Failed Error: {message} {location}")]
    StartupFailed {
        message: String,
        location: ErrorLocation,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("Watch Error: {source} {location}")]
    Watch {
        location: ErrorLocation,
        #[source]
        source: WatchError,
    },

    #[error("Connection Error: {source} {location}")]
    Connection {
        location: ErrorLocation,
        #[source]
        source: ConnectionError,
    },

    #[error("Startup Timeout Error: no marker at {path} after {timeout:?} {location}")]
    StartupTimeout {
        path: PathBuf,
        timeout: Duration,
        location: ErrorLocation,
    },
}

impl StartupError {
    #[track_caller]
    pub fn cache_dir(path: &Path, source: IoError) -> Self {
        StartupError::CacheDir {
            path: path.to_path_buf(),
            location: ErrorLocation::caller(),
            source,
        }
    }

    #[track_caller]
    pub fn marker_read(path: &Path, message: impl Into<String>) -> Self {
        StartupError::MarkerRead {
            path: path.to_path_buf(),
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn startup_failed(
        message: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        StartupError::StartupFailed {
            message: message.into(),
            location: ErrorLocation::caller(),
            source: source.into(),
        }
    }

    #[track_caller]
    pub fn startup_timeout(path: &Path, timeout: Duration) -> Self {
        StartupError::StartupTimeout {
            path: path.to_path_buf(),
            timeout,
            location: ErrorLocation::caller(),
        }
    }

    /// Short name of the failure class, for log fields.
    pub fn error_category(&self) -> &'static str {
        match self {
            StartupError::CacheDir { .. } => "cache_dir",
            StartupError::MarkerRead { .. } => "marker_read",
            StartupError::StartupFailed { .. } => "startup_failed",
            StartupError::Watch { .. } => "watch",
            StartupError::Connection { .. } => "connection",
            StartupError::StartupTimeout { .. } => "startup_timeout",
        }
    }
}

impl From<WatchError> for StartupError {
    #[track_caller]
    fn from(source: WatchError) -> Self {
        StartupError::Watch {
            location: ErrorLocation::caller(),
            source,
        }
    }
}

impl From<ConnectionError> for StartupError {
    #[track_caller]
    fn from(source: ConnectionError) -> Self {
        StartupError::Connection {
            location: ErrorLocation::caller(),
            source,
        }
    }
}
