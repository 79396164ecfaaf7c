use client_core::watcher::WatchMode;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

const LOG_SUBDIR: &str = "analysis-client";

#[derive(Debug, Parser)]
#[command(name = "analysis-client")]
#[command(about = "Connect to a project's analysis server, launching it if needed")]
#[command(version)]
pub struct Cli {
    /// Path to the project's TOML config
    #[arg(short, long)]
    pub config: PathBuf,

    /// Seconds to wait for a launched server to publish its port
    #[arg(long, default_value_t = 120)]
    pub startup_timeout_secs: u64,

    /// Directory for the log file (defaults to the platform cache dir)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Poll the cache directory at this interval instead of using native notifications
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// WebSocket endpoint path on the server
    #[arg(long)]
    pub endpoint: Option<String>,
}

impl Cli {
    pub fn watch_mode(&self) -> WatchMode {
        match self.poll_interval_ms {
            Some(ms) => WatchMode::Poll {
                interval: Duration::from_millis(ms),
            },
            None => WatchMode::Native,
        }
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn log_dir(&self) -> PathBuf {
        match &self.log_dir {
            Some(dir) => dir.clone(),
            None => dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(LOG_SUBDIR),
        }
    }
}
