pub mod cache_dir;
pub mod config;
pub mod connection;
pub mod error;
pub mod launcher;
pub mod marker;
pub mod startup;
pub mod watcher;

#[cfg(test)]
mod tests;

pub use config::{ProjectConfig, ServerCommand};
pub use connection::{ConnectionFactory, MessageHandler};
pub use launcher::{ProcessHandle, ServerLauncher};
pub use marker::Port;
pub use startup::StartupCoordinator;
pub use watcher::{FileWatcher, MarkerEvents, WatchEvent};

pub const MARKER_FILE_NAME: &str = "http";
pub const ANALYSIS_SERVER_HOSTNAME: &str = "127.0.0.1";
pub const ANALYSIS_SERVER_WS_BASE_URL: &str =
    const_format::concatcp!("ws://", ANALYSIS_SERVER_HOSTNAME);
pub const DEFAULT_WS_ENDPOINT: &str = "jerky";
