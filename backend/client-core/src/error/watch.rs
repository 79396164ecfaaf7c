use common::ErrorLocation;

use std::path::PathBuf;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum WatchError {
    /// The path could not be registered with the watcher backend.
    #[error("Watch Install Error: {path}: {message} {location}")]
    Install {
        path: PathBuf,
        message: String,
        location: ErrorLocation,
        #[source]
        source: notify::Error,
    },

    /// The backend reported a failure after the watch was installed.
    #[error("Watch Backend Error: {message} {location}")]
    Backend {
        message: String,
        location: ErrorLocation,
    },

    #[error("Watch Closed Error: {path} {location}")]
    Closed {
        path: PathBuf,
        location: ErrorLocation,
    },
}
