//! Recording test doubles for the startup coordinator's collaborators.
//!
//! Every double appends to a shared [`Recorder`] so tests can assert on the
//! order and timing of side effects across watcher, launcher and factory.

use client_core::error::connection::ConnectionError;
use client_core::error::launch::LaunchError;
use client_core::error::watch::WatchError;
use client_core::watcher::WatchEventKind;
use client_core::{
    ConnectionFactory, FileWatcher, MarkerEvents, MessageHandler, Port, ProcessHandle,
    ProjectConfig, ServerLauncher, WatchEvent,
};

use common::ErrorLocation;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use futures_util::stream::{empty, unfold};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::time::sleep as TokioSleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Watch,
    Launch,
    LaunchDone,
    Connect,
}

#[derive(Debug, Clone, Default)]
pub struct Recorder {
    steps: Arc<Mutex<Vec<(Step, Instant)>>>,
}

impl Recorder {
    pub fn record(&self, step: Step) {
        self.steps.lock().unwrap().push((step, Instant::now()));
    }

    pub fn steps(&self) -> Vec<Step> {
        self.steps.lock().unwrap().iter().map(|(s, _)| *s).collect()
    }

    pub fn count(&self, step: Step) -> usize {
        self.steps().iter().filter(|s| **s == step).count()
    }

    pub fn first(&self, step: Step) -> Option<Instant> {
        self.steps
            .lock()
            .unwrap()
            .iter()
            .find(|(s, _)| *s == step)
            .map(|(_, at)| *at)
    }
}

pub fn noop_handler() -> MessageHandler {
    Arc::new(|_message: String| {})
}

pub fn project(cache_dir: &Path) -> ProjectConfig {
    ProjectConfig::new("fixture", cache_dir.parent().unwrap_or(cache_dir), cache_dir)
}

/// Publish a marker the way a well-behaved server does: write then rename.
pub fn publish_marker(cache_dir: &Path, content: &str) {
    let tmp = cache_dir.join("http.tmp");
    std::fs::write(&tmp, content).unwrap();
    std::fs::rename(&tmp, cache_dir.join("http")).unwrap();
}

pub fn marker_event(cache_dir: &Path) -> Result<WatchEvent, WatchError> {
    Ok(WatchEvent {
        path: cache_dir.join("http"),
        kind: WatchEventKind::Created,
    })
}

// ----------------------------------------------------------------------------
// Watcher
// ----------------------------------------------------------------------------

type EventSender = UnboundedSender<Result<WatchEvent, WatchError>>;
type EventReceiver = UnboundedReceiver<Result<WatchEvent, WatchError>>;

/// Watcher whose events are pushed by the test through [`FakeWatcher::sender`].
pub struct FakeWatcher {
    recorder: Recorder,
    receiver: Mutex<Option<EventReceiver>>,
    sender: EventSender,
    fail_install: bool,
    end_immediately: bool,
    watched: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeWatcher {
    pub fn new(recorder: &Recorder) -> Self {
        let (sender, receiver) = unbounded_channel();
        Self {
            recorder: recorder.clone(),
            receiver: Mutex::new(Some(receiver)),
            sender,
            fail_install: false,
            end_immediately: false,
            watched: Arc::default(),
        }
    }

    pub fn failing(recorder: &Recorder) -> Self {
        Self {
            fail_install: true,
            ..Self::new(recorder)
        }
    }

    /// Installs fine, but the stream ends without yielding anything.
    pub fn ending(recorder: &Recorder) -> Self {
        Self {
            end_immediately: true,
            ..Self::new(recorder)
        }
    }

    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    pub fn watched(&self) -> Arc<Mutex<Vec<PathBuf>>> {
        Arc::clone(&self.watched)
    }
}

impl FileWatcher for FakeWatcher {
    fn watch(&self, path: &Path) -> Result<MarkerEvents, WatchError> {
        self.recorder.record(Step::Watch);
        self.watched.lock().unwrap().push(path.to_path_buf());

        if self.fail_install {
            return Err(WatchError::Install {
                path: path.to_path_buf(),
                message: "unwatchable".to_string(),
                location: ErrorLocation::caller(),
                source: notify::Error::generic("unwatchable"),
            });
        }

        if self.end_immediately {
            return Ok(empty().boxed());
        }

        let receiver = self
            .receiver
            .lock()
            .unwrap()
            .take()
            .expect("FakeWatcher::watch called twice");

        Ok(unfold(receiver, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) }).boxed())
    }
}

// ----------------------------------------------------------------------------
// Launcher
// ----------------------------------------------------------------------------

#[derive(Clone)]
pub struct FakeLauncher {
    recorder: Recorder,
    delay: Duration,
    pid: Option<u32>,
    marker: Option<(PathBuf, String, Duration)>,
}

impl FakeLauncher {
    /// Resolves with `pid` after `delay`.
    pub fn resolving(recorder: &Recorder, pid: u32, delay: Duration) -> Self {
        Self {
            recorder: recorder.clone(),
            delay,
            pid: Some(pid),
            marker: None,
        }
    }

    /// Fails after `delay`.
    pub fn failing(recorder: &Recorder, delay: Duration) -> Self {
        Self {
            recorder: recorder.clone(),
            delay,
            pid: None,
            marker: None,
        }
    }

    /// Like a real server: publishes `content` as the marker `after` the launch call.
    pub fn publishing(mut self, cache_dir: &Path, content: &str, after: Duration) -> Self {
        self.marker = Some((cache_dir.to_path_buf(), content.to_string(), after));
        self
    }
}

impl ServerLauncher for FakeLauncher {
    async fn launch(&self, _config: &ProjectConfig) -> Result<ProcessHandle, LaunchError> {
        self.recorder.record(Step::Launch);

        if let Some((cache_dir, content, after)) = self.marker.clone() {
            tokio::spawn(async move {
                TokioSleep(after).await;
                publish_marker(&cache_dir, &content);
            });
        }

        TokioSleep(self.delay).await;
        self.recorder.record(Step::LaunchDone);

        match self.pid {
            Some(pid) => Ok(ProcessHandle::new(pid)),
            None => Err(LaunchError::Validation {
                message: "server binary missing".to_string(),
                location: ErrorLocation::caller(),
            }),
        }
    }
}

// ----------------------------------------------------------------------------
// Connection factory
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeConnection {
    pub port: Port,
    pub process: Option<ProcessHandle>,
}

#[derive(Debug, Clone)]
pub struct ConnectCall {
    pub port: String,
    pub process: Option<ProcessHandle>,
    pub at: Instant,
}

#[derive(Clone)]
pub struct FakeFactory {
    recorder: Recorder,
    calls: Arc<Mutex<Vec<ConnectCall>>>,
    delay: Duration,
    fail: bool,
}

impl FakeFactory {
    pub fn new(recorder: &Recorder) -> Self {
        Self {
            recorder: recorder.clone(),
            calls: Arc::default(),
            delay: Duration::ZERO,
            fail: false,
        }
    }

    pub fn failing(recorder: &Recorder) -> Self {
        Self {
            fail: true,
            ..Self::new(recorder)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<ConnectCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl ConnectionFactory for FakeFactory {
    type Connection = FakeConnection;

    async fn connect(
        &self,
        port: Port,
        _on_message: MessageHandler,
        process: Option<ProcessHandle>,
    ) -> Result<FakeConnection, ConnectionError> {
        self.recorder.record(Step::Connect);
        self.calls.lock().unwrap().push(ConnectCall {
            port: port.to_string(),
            process,
            at: Instant::now(),
        });

        TokioSleep(self.delay).await;

        if self.fail {
            return Err(ConnectionError::Closed {
                message: "handshake refused".to_string(),
                location: ErrorLocation::caller(),
            });
        }

        Ok(FakeConnection { port, process })
    }
}
