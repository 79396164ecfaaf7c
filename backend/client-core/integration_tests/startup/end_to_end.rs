use crate::helpers::{FakeFactory, FakeLauncher, Recorder, noop_handler, project, publish_marker};

use client_core::error::launch::LaunchError;
use client_core::watcher::{NotifyWatcher, WatchMode};
use client_core::{
    MessageHandler, ProcessHandle, ProjectConfig, ServerLauncher, StartupCoordinator,
    connection::WsConnectionFactory,
};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc::unbounded_channel;
use tokio::time::timeout as TokioTimeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

const TIMEOUT: Duration = Duration::from_secs(10);

async fn run_scenario(mode: WatchMode) {
    // GIVEN: An empty cache dir; the launcher resolves its handle at 50ms and the
    // server publishes "9090" at 100ms
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::default();
    let factory = FakeFactory::new(&recorder).with_delay(Duration::from_millis(20));
    let launcher = FakeLauncher::resolving(&recorder, 4242, Duration::from_millis(50)).publishing(
        dir.path(),
        "9090",
        Duration::from_millis(100),
    );
    let coordinator = StartupCoordinator::new(launcher, NotifyWatcher::new(mode), factory.clone())
        .with_startup_timeout(TIMEOUT);

    // WHEN: Starting the client against the real filesystem watcher
    let started = Instant::now();
    let connection = coordinator
        .start_client(&project(dir.path()), noop_handler())
        .await
        .unwrap();
    let resolved = started.elapsed();

    // THEN: The factory ran once, at or after 100ms, with the port and the handle
    let calls = factory.calls();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.port, "9090");
    assert_eq!(call.process, Some(ProcessHandle::new(4242)));
    let called_after = call.at.duration_since(started);
    assert!(called_after >= Duration::from_millis(100), "{called_after:?}");

    // AND: The call resolved no earlier than the factory's own 20ms handshake
    assert!(resolved >= called_after + Duration::from_millis(20));
    assert_eq!(connection.process, Some(ProcessHandle::new(4242)));
}

/// **VALUE**: Runs the full race path against a real inotify/FSEvents watcher.
///
/// **WHY THIS MATTERS**: The doubles prove ordering; this proves the real watcher sees an
/// atomically renamed marker in a directory that was created moments earlier, and that the
/// process handle that arrived first is passed along.
#[tokio::test]
async fn given_empty_cache_dir_when_server_publishes_marker_then_connects_with_handle() {
    run_scenario(WatchMode::Native).await;
}

#[tokio::test]
async fn given_polling_watcher_when_server_publishes_marker_then_connects_with_handle() {
    run_scenario(WatchMode::Poll {
        interval: Duration::from_millis(20),
    })
    .await;
}

// ----------------------------------------------------------------------------
// Real WebSocket server
// ----------------------------------------------------------------------------

/// Stands in for the analysis server: listens on an ephemeral port, greets each
/// client, echoes text frames, then publishes the port as its marker.
struct LoopbackServerLauncher {
    cache_dir: PathBuf,
}

impl ServerLauncher for LoopbackServerLauncher {
    async fn launch(&self, _config: &ProjectConfig) -> Result<ProcessHandle, LaunchError> {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut ws = accept_async(stream).await.unwrap();
                    ws.send(Message::text("server ready")).await.unwrap();
                    while let Some(Ok(Message::Text(text))) = ws.next().await {
                        ws.send(Message::text(format!("echo: {}", text.as_str())))
                            .await
                            .unwrap();
                    }
                });
            }
        });

        publish_marker(&self.cache_dir, &format!("{port}\n"));
        Ok(ProcessHandle::new(std::process::id()))
    }
}

/// **VALUE**: Exercises the default stack end to end: notify watcher, coordinator and
/// WebSocket factory against a live loopback server.
///
/// **WHY THIS MATTERS**: Proves out-of-band messages reach the handler and the returned
/// connection can talk to the server the marker pointed at.
#[tokio::test]
async fn given_loopback_server_when_started_then_connection_exchanges_messages() {
    // GIVEN: A launcher that brings up a loopback server and publishes its port
    let dir = tempfile::tempdir().unwrap();
    let launcher = LoopbackServerLauncher {
        cache_dir: dir.path().to_path_buf(),
    };
    let coordinator = StartupCoordinator::new(
        launcher,
        NotifyWatcher::new(WatchMode::Native),
        WsConnectionFactory::new(),
    )
    .with_startup_timeout(TIMEOUT);

    let (tx, mut rx) = unbounded_channel();
    let handler: MessageHandler = Arc::new(move |message: String| {
        let _ = tx.send(message);
    });

    // WHEN: Starting the client and sending a message
    let connection = coordinator
        .start_client(&project(dir.path()), handler)
        .await
        .unwrap();
    connection.send("hello").await.unwrap();

    // THEN: The greeting and the echo both reach the handler
    let first = TokioTimeout(TIMEOUT, rx.recv()).await.unwrap().unwrap();
    let second = TokioTimeout(TIMEOUT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(first, "server ready");
    assert_eq!(second, "echo: hello");

    connection.close().await.unwrap();
}
