pub mod config;
pub mod connection;
pub mod launch;
pub mod startup;
pub mod watch;

pub use startup::StartupError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Startup(#[from] startup::StartupError),
}
