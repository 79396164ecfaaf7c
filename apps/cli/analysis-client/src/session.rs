//! One client session: start (or find) the project's server, print what it
//! pushes, and forward stdin lines to it until EOF.

use crate::cli::Cli;
use crate::error::AppError;

use client_core::connection::{ServerConnection, WsConnectionFactory};
use client_core::launcher::CommandLauncher;
use client_core::watcher::NotifyWatcher;
use client_core::{MessageHandler, ProjectConfig, StartupCoordinator};

use common::ErrorLocation;

use std::sync::Arc;

use log::{debug, info};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, stdin};

pub fn build_coordinator(
    cli: &Cli,
) -> StartupCoordinator<CommandLauncher, NotifyWatcher, WsConnectionFactory> {
    let factory = match &cli.endpoint {
        Some(endpoint) => WsConnectionFactory::new().with_endpoint(endpoint.as_str()),
        None => WsConnectionFactory::new(),
    };

    StartupCoordinator::new(
        CommandLauncher::new(),
        NotifyWatcher::new(cli.watch_mode()),
        factory,
    )
    .with_startup_timeout(cli.startup_timeout())
}

fn print_handler() -> MessageHandler {
    Arc::new(|message: String| println!("{message}"))
}

/// Run a session with stdin as the request source.
///
/// # Errors
///
/// Returns [`AppError`] if the project cannot be loaded, the server cannot be
/// started or reached, or the connection fails mid-session.
pub async fn run(cli: &Cli) -> Result<(), AppError> {
    let config = ProjectConfig::load(&cli.config)?;
    let coordinator = build_coordinator(cli);

    let connection = coordinator.start_client(&config, print_handler()).await?;
    info!(
        "Connected to '{}' on port {}{}",
        config.name,
        connection.port(),
        connection
            .process()
            .map(|process| format!(" ({process})"))
            .unwrap_or_default()
    );

    forward_lines(&connection, BufReader::new(stdin())).await?;
    connection.close().await?;
    Ok(())
}

/// Send each non-blank line from `input` to the server. Returns the number
/// of lines sent once `input` reaches EOF.
///
/// # Errors
///
/// Returns [`AppError::Client`] if reading fails and [`AppError::Session`]
/// if sending fails.
pub async fn forward_lines<R>(connection: &ServerConnection, input: R) -> Result<usize, AppError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut sent = 0;

    while let Some(line) = lines.next_line().await.map_err(|e| AppError::Client {
        message: format!("Failed to read input: {e}"),
        location: ErrorLocation::caller(),
    })? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        connection.send(line).await?;
        sent += 1;
    }

    debug!("Input closed after {sent} messages");
    Ok(sent)
}
