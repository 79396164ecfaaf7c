//! Startup coordinator: connect to a running analysis server, or launch one
//! and connect once it publishes its marker.
//!
//! # Ordering
//!
//! Two orderings are load-bearing and must survive refactoring:
//!
//! 1. The marker existence check happens before any watcher is installed.
//!    A marker written before the watcher existed produces no event.
//! 2. The watcher is installed before the launcher is invoked. The server
//!    may write its marker as soon as it starts.
//!
//! # Resolution
//!
//! The connection factory is invoked at most once per call, and the call
//! resolves exactly once. The watcher is released on its first marker event.
//! A launch that has not finished when the call resolves keeps running; its
//! outcome is only logged.

pub mod state;

pub use state::StartupState;

use crate::cache_dir::ensure_exists;
use crate::config::ProjectConfig;
use crate::connection::{ConnectionFactory, MessageHandler};
use crate::error::StartupError;
use crate::error::launch::LaunchError;
use crate::error::watch::WatchError;
use crate::launcher::{ProcessHandle, ServerLauncher};
use crate::marker::{marker_path, read_port};
use crate::watcher::{FileWatcher, MarkerEvents, WatchEvent};

use common::ErrorLocation;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{FutureExt, StreamExt};
use log::{debug, info, warn};
use tokio::fs::try_exists;
use tokio::runtime::Handle as RuntimeHandle;
use tokio::spawn as TokioSpawn;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::sleep as TokioSleep;

const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(120);

type LaunchTask = JoinHandle<Result<ProcessHandle, LaunchError>>;

pub struct StartupCoordinator<L, W, F> {
    launcher: Arc<L>,
    watcher: W,
    factory: F,
    startup_timeout: Duration,
}

impl<L, W, F> StartupCoordinator<L, W, F>
where
    L: ServerLauncher,
    W: FileWatcher,
    F: ConnectionFactory,
{
    pub fn new(launcher: L, watcher: W, factory: F) -> Self {
        Self {
            launcher: Arc::new(launcher),
            watcher,
            factory,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
        }
    }

    /// How long to wait for a launched server to publish its marker.
    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    pub fn startup_timeout(&self) -> Duration {
        self.startup_timeout
    }

    /// Return a connection to the project's analysis server, launching the
    /// server first when no marker exists.
    ///
    /// Concurrent calls for the same cache directory are not coordinated:
    /// each one performs its own check, watch and launch.
    ///
    /// # Errors
    ///
    /// - [`StartupError::CacheDir`] if the cache directory cannot be created;
    ///   nothing is watched or launched
    /// - [`StartupError::MarkerRead`] if the marker cannot be read or parsed
    /// - [`StartupError::Watch`] if the watcher cannot be installed or fails
    /// - [`StartupError::StartupFailed`] if the launch fails before the marker appears
    /// - [`StartupError::StartupTimeout`] if no marker appears in time
    /// - [`StartupError::Connection`] if the connection factory fails
    pub async fn start_client(
        &self,
        config: &ProjectConfig,
        on_message: MessageHandler,
    ) -> Result<F::Connection, StartupError> {
        let mut pending = PendingStartup::new(marker_path(config.cache_dir()));

        let result = self.drive(&mut pending, config, on_message).await;

        match &result {
            Ok(_) => {
                pending.advance(StartupState::Connected);
                info!("Client ready for '{}'", config.name);
            }
            Err(e) => {
                pending.advance(StartupState::Failed);
                warn!(
                    "Client startup for '{}' failed ({}): {e}",
                    config.name,
                    e.error_category()
                );
            }
        }

        result
    }

    async fn drive(
        &self,
        pending: &mut PendingStartup,
        config: &ProjectConfig,
        on_message: MessageHandler,
    ) -> Result<F::Connection, StartupError> {
        let cache_dir = config.cache_dir();
        ensure_exists(cache_dir)
            .await
            .map_err(|e| StartupError::cache_dir(cache_dir, e))?;

        pending.advance(StartupState::CheckingMarker);

        // Must precede any watcher: an existing marker produces no event.
        if marker_exists(&pending.marker).await? {
            debug!("Marker already present, connecting to running server");
            let port = read_port(&pending.marker).await?;

            pending.advance(StartupState::Connecting);
            let connection = self.factory.connect(port, on_message, None).await?;
            return Ok(connection);
        }

        pending.advance(StartupState::WatchingAndLaunching);

        // Watch before launch: the server may publish its marker as soon as it runs.
        let events = self.watcher.watch(&pending.marker)?;
        pending.install_watcher(events);
        debug!("No server running, launching one");
        pending.start_launch(self.spawn_launch(config));

        let event = pending.wait_for_marker(self.startup_timeout).await?;
        debug!("Marker {:?} at {}", event.kind, event.path.display());

        let port = read_port(&pending.marker).await?;
        let process = pending.available_process();

        pending.advance(StartupState::Connecting);
        let connection = self.factory.connect(port, on_message, process).await?;
        Ok(connection)
    }

    fn spawn_launch(&self, config: &ProjectConfig) -> LaunchTask {
        let launcher = Arc::clone(&self.launcher);
        let config = config.clone();

        TokioSpawn(async move { launcher.launch(&config).await })
    }
}

async fn marker_exists(marker: &Path) -> Result<bool, StartupError> {
    try_exists(marker)
        .await
        .map_err(|e| StartupError::marker_read(marker, format!("Failed to check marker: {e}")))
}

/// In-flight state of one `start_client` call. Never shared between calls.
struct PendingStartup {
    marker: PathBuf,
    state: StartupState,
    events: Option<MarkerEvents>,
    launch: Option<LaunchTask>,
    process: Option<ProcessHandle>,
}

impl PendingStartup {
    fn new(marker: PathBuf) -> Self {
        Self {
            marker,
            state: StartupState::Init,
            events: None,
            launch: None,
            process: None,
        }
    }

    fn advance(&mut self, next: StartupState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal startup transition {:?} -> {next:?}",
            self.state
        );
        debug!(
            "Startup for {}: {:?} -> {next:?}",
            self.marker.display(),
            self.state
        );
        self.state = next;
    }

    fn install_watcher(&mut self, events: MarkerEvents) {
        debug_assert!(self.events.is_none(), "one watcher per startup");
        debug_assert!(self.launch.is_none(), "watcher installed after launch");
        self.events = Some(events);
    }

    fn start_launch(&mut self, launch: LaunchTask) {
        debug_assert!(self.events.is_some(), "launch started before watcher");
        self.launch = Some(launch);
    }

    /// Wait for the first marker event, recording the process handle if the
    /// launch completes first. The watcher is dropped before returning.
    async fn wait_for_marker(&mut self, timeout: Duration) -> Result<WatchEvent, StartupError> {
        let Some(mut events) = self.events.take() else {
            return Err(WatchError::Closed {
                path: self.marker.clone(),
                location: ErrorLocation::caller(),
            }
            .into());
        };

        let deadline = TokioSleep(timeout);
        tokio::pin!(deadline);

        let event = loop {
            tokio::select! {
                biased;

                joined = settle(&mut self.launch), if self.launch.is_some() => {
                    self.launch = None;
                    self.process = Some(launch_outcome(joined)?);
                }

                item = events.next() => match item {
                    Some(Ok(event)) => break event,
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        return Err(WatchError::Closed {
                            path: self.marker.clone(),
                            location: ErrorLocation::caller(),
                        }
                        .into());
                    }
                },

                () = &mut deadline => {
                    return Err(StartupError::startup_timeout(&self.marker, timeout));
                }
            }
        };

        drop(events);
        debug!("Watcher on {} released", self.marker.display());
        Ok(event)
    }

    /// The process handle if the launch has already produced one. Never waits.
    fn available_process(&mut self) -> Option<ProcessHandle> {
        if self.process.is_none()
            && let Some(joined) = self.launch.as_mut().and_then(|task| task.now_or_never())
        {
            self.launch = None;
            match joined {
                Ok(Ok(handle)) => self.process = Some(handle),
                Ok(Err(e)) => warn!("Server launch failed although the marker appeared: {e}"),
                Err(e) => warn!("Server launch task ended abnormally: {e}"),
            }
        }

        if self.process.is_none() {
            debug!("Connecting before the launch reported a process handle");
        }

        self.process
    }
}

impl Drop for PendingStartup {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            debug!(
                "Startup for {} abandoned in {:?}",
                self.marker.display(),
                self.state
            );
        }

        if let Some(launch) = self.launch.take()
            && let Ok(runtime) = RuntimeHandle::try_current()
        {
            runtime.spawn(observe_launch(launch));
        }
    }
}

async fn settle(
    launch: &mut Option<LaunchTask>,
) -> Result<Result<ProcessHandle, LaunchError>, JoinError> {
    match launch {
        Some(task) => task.await,
        None => std::future::pending().await,
    }
}

#[track_caller]
fn launch_outcome(
    joined: Result<Result<ProcessHandle, LaunchError>, JoinError>,
) -> Result<ProcessHandle, StartupError> {
    match joined {
        Ok(Ok(handle)) => {
            debug!("Server launched ({handle}), still waiting for marker");
            Ok(handle)
        }
        Ok(Err(e)) => Err(StartupError::startup_failed("Server launch failed", e)),
        Err(e) => Err(StartupError::startup_failed(
            "Server launch task ended abnormally",
            e,
        )),
    }
}

async fn observe_launch(launch: LaunchTask) {
    match launch.await {
        Ok(Ok(handle)) => debug!("Server launch finished after startup resolved ({handle})"),
        Ok(Err(e)) => warn!("Server launch failed after startup resolved: {e}"),
        Err(e) => warn!("Server launch task ended abnormally: {e}"),
    }
}
