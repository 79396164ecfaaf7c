use crate::config::{ProjectConfig, ServerCommand};
use crate::error::launch::LaunchError;
use crate::launcher::{ProcessHandle, ServerLauncher};

use common::ErrorLocation;

use std::path::Path;
use std::process::Stdio;

use log::{debug, info, trace, warn};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child as TokioChild;
use tokio::process::Command as TokioCommand;
use tokio::spawn as TokioSpawn;

/// Launches the server as a child process described by
/// [`ProjectConfig::server`].
///
/// The child's stdout and stderr are drained into the log at trace level and
/// a detached task reaps it and logs its exit status. The child is not killed
/// when the launcher or coordinator goes away.
#[derive(Debug, Clone, Default)]
pub struct CommandLauncher;

impl CommandLauncher {
    pub fn new() -> Self {
        Self
    }
}

pub(crate) fn build_launch_command(server: &ServerCommand, root_dir: &Path) -> TokioCommand {
    let mut cmd = TokioCommand::new(&server.program);
    cmd.args(&server.args)
        .envs(&server.env)
        .current_dir(server.working_dir.as_deref().unwrap_or(root_dir))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

impl ServerLauncher for CommandLauncher {
    async fn launch(&self, config: &ProjectConfig) -> Result<ProcessHandle, LaunchError> {
        let server = &config.server;

        if server.program.trim().is_empty() {
            return Err(LaunchError::Validation {
                message: format!("No server program configured for '{}'", config.name),
                location: ErrorLocation::caller(),
            });
        }

        info!(
            "Launching analysis server for '{}': {} {}",
            config.name,
            server.program,
            server.args.join(" ")
        );

        let mut child = build_launch_command(server, &config.root_dir)
            .spawn()
            .map_err(|e| LaunchError::Spawn {
                message: format!("Failed to spawn {}: {e}", server.program),
                location: ErrorLocation::caller(),
                source: Box::new(e),
            })?;

        let Some(pid) = child.id() else {
            return Err(LaunchError::Validation {
                message: format!("{} exited before reporting a PID", server.program),
                location: ErrorLocation::caller(),
            });
        };

        if let Some(stdout) = child.stdout.take() {
            TokioSpawn(forward_output(stdout, pid, "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            TokioSpawn(forward_output(stderr, pid, "stderr"));
        }

        TokioSpawn(supervise(child, pid));

        info!("Analysis server spawned (PID: {pid})");
        Ok(ProcessHandle::new(pid))
    }
}

/// Drain one of the child's pipes into the log until EOF.
///
/// The server keeps writing for its whole lifetime, so the pipe must stay
/// open past lines that are not valid UTF-8.
async fn forward_output<R>(stream: R, pid: u32, name: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                trace!("Server {pid} {name}: {}", text.trim_end());
            }
            Err(e) => {
                debug!("Stopped reading server {pid} {name}: {e}");
                break;
            }
        }
    }
}

async fn supervise(mut child: TokioChild, pid: u32) {
    match child.wait().await {
        Ok(status) if status.success() => debug!("Server {pid} exited: {status}"),
        Ok(status) => warn!("Server {pid} exited: {status}"),
        Err(e) => warn!("Failed to wait on server {pid}: {e}"),
    }
}
