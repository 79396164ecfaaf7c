use analysis_client::cli::Cli;
use analysis_client::error::AppError;
use analysis_client::logger::initialize as LoggerInitialize;
use analysis_client::session::run;

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::process::ExitCode;

use clap::Parser;
use log::info;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match start(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn start(cli: &Cli) -> Result<(), AppError> {
    let log_dir = cli.log_dir();
    create_dir_all(&log_dir).map_err(|e| AppError::Client {
        message: format!("Failed to create log directory {}: {e}", log_dir.display()),
        location: ErrorLocation::caller(),
    })?;

    // Initialize logger FIRST
    LoggerInitialize(&log_dir)?;

    info!("Analysis client starting");
    info!("Log directory: {}", log_dir.display());

    run(cli).await
}
