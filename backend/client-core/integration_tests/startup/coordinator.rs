use crate::helpers::{
    FakeFactory, FakeLauncher, FakeWatcher, Recorder, Step, marker_event, noop_handler, project,
    publish_marker,
};

use client_core::StartupCoordinator;
use client_core::error::StartupError;
use client_core::error::launch::LaunchError;
use client_core::error::watch::WatchError;

use std::error::Error;
use std::time::{Duration, Instant};

use tokio::time::sleep as TokioSleep;

const QUICK: Duration = Duration::from_millis(10);
const TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Fast path: marker already present
// ============================================================================

/// **VALUE**: Verifies that an existing marker short-circuits straight to the connection
/// factory, with the trimmed port and no process handle.
///
/// **WHY THIS MATTERS**: The common case is a server that is already running. Launching a
/// second server here would fight the first one for the same cache directory.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The fast-path check is moved after watcher installation
/// - The launcher is invoked unconditionally
/// - The marker content is passed to the factory untrimmed
#[tokio::test]
async fn given_existing_marker_when_start_client_called_then_connects_without_launching() {
    // GIVEN: A cache dir whose marker is already published
    let dir = tempfile::tempdir().unwrap();
    publish_marker(dir.path(), " 9090\n");

    let recorder = Recorder::default();
    let factory = FakeFactory::new(&recorder);
    let coordinator = StartupCoordinator::new(
        FakeLauncher::resolving(&recorder, 42, QUICK),
        FakeWatcher::new(&recorder),
        factory.clone(),
    );

    // WHEN: Starting the client
    let connection = coordinator
        .start_client(&project(dir.path()), noop_handler())
        .await
        .unwrap();

    // THEN: Only the factory ran, with port "9090" and no process handle
    assert_eq!(recorder.steps(), vec![Step::Connect]);
    let calls = factory.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].port, "9090");
    assert_eq!(calls[0].process, None);
    assert_eq!(connection.port.get(), 9090);
}

#[tokio::test]
async fn given_existing_garbage_marker_when_start_client_called_then_returns_marker_read_error() {
    // GIVEN: A marker that does not hold a port
    let dir = tempfile::tempdir().unwrap();
    publish_marker(dir.path(), "starting...");

    let recorder = Recorder::default();
    let coordinator = StartupCoordinator::new(
        FakeLauncher::resolving(&recorder, 42, QUICK),
        FakeWatcher::new(&recorder),
        FakeFactory::new(&recorder),
    );

    // WHEN: Starting the client
    let result = coordinator
        .start_client(&project(dir.path()), noop_handler())
        .await;

    // THEN: MarkerRead, and nothing else was attempted
    assert!(matches!(result, Err(StartupError::MarkerRead { .. })));
    assert!(recorder.steps().is_empty());
}

// ============================================================================
// Race path: watch, launch, wait for marker
// ============================================================================

/// **VALUE**: Verifies the watcher is installed strictly before the launcher is invoked.
///
/// **WHY THIS MATTERS**: A fast server can publish its marker immediately after starting. If
/// the launcher ran first, the creation event could fire before anyone listens and startup
/// would hang until the timeout.
///
/// **BUG THIS CATCHES**: Would catch a refactor that starts the launch first "to save time".
#[tokio::test]
async fn given_no_marker_when_start_client_called_then_watch_precedes_launch() {
    // GIVEN: An empty cache dir and a launcher that publishes the marker
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::default();
    let watcher = FakeWatcher::new(&recorder);
    let events = watcher.sender();
    let coordinator = StartupCoordinator::new(
        FakeLauncher::resolving(&recorder, 42, QUICK).publishing(dir.path(), "9090", QUICK),
        watcher,
        FakeFactory::new(&recorder),
    )
    .with_startup_timeout(TIMEOUT);

    // WHEN: Starting the client and signalling the marker once it exists
    let config = project(dir.path());
    let start = coordinator.start_client(&config, noop_handler());
    let signal = async {
        while !dir.path().join("http").exists() {
            TokioSleep(QUICK).await;
        }
        events.send(marker_event(dir.path())).unwrap();
    };
    let (result, ()) = tokio::join!(start, signal);

    // THEN: Watch was recorded before Launch, by position and by time
    result.unwrap();
    let steps = recorder.steps();
    let watch_at = steps.iter().position(|s| *s == Step::Watch).unwrap();
    let launch_at = steps.iter().position(|s| *s == Step::Launch).unwrap();
    assert!(watch_at < launch_at, "steps: {steps:?}");
    assert!(recorder.first(Step::Watch).unwrap() <= recorder.first(Step::Launch).unwrap());
}

/// **VALUE**: Verifies the connection factory runs exactly once even when the watched path
/// fires several events.
///
/// **WHY THIS MATTERS**: Watchers routinely report create + modify + close-write for a single
/// write. Each extra event must not produce another connection.
///
/// **BUG THIS CATCHES**: Would catch if the watcher is not released after the first event or
/// if connecting is done per event.
#[tokio::test]
async fn given_repeated_marker_events_when_start_client_called_then_connects_once() {
    // GIVEN: The marker on disk and three events queued for the watcher
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::default();
    let watcher = FakeWatcher::new(&recorder);
    let events = watcher.sender();
    let factory = FakeFactory::new(&recorder);
    let coordinator = StartupCoordinator::new(
        FakeLauncher::resolving(&recorder, 42, Duration::from_secs(1)),
        watcher,
        factory.clone(),
    )
    .with_startup_timeout(TIMEOUT);

    let config = project(dir.path());
    let start = coordinator.start_client(&config, noop_handler());
    let signal = async {
        while recorder.count(Step::Launch) == 0 {
            TokioSleep(QUICK).await;
        }
        publish_marker(dir.path(), "9090");
        for _ in 0..3 {
            events.send(marker_event(dir.path())).unwrap();
        }
    };

    // WHEN: Startup completes
    let (result, ()) = tokio::join!(start, signal);

    // THEN: One factory call, and the watcher stream has been dropped
    result.unwrap();
    assert_eq!(factory.calls().len(), 1);
    assert_eq!(recorder.count(Step::Connect), 1);
    assert!(events.is_closed(), "watcher should be released after first event");
}

/// **VALUE**: Verifies that a slow launch never delays the connection.
///
/// **WHY THIS MATTERS**: The process handle is diagnostic only. Some launchers resolve long
/// after the server is listening (wrapper scripts, build tools). Waiting on them would add
/// their whole runtime to every editor startup.
#[tokio::test]
async fn given_launch_slower_than_marker_when_start_client_called_then_connects_without_handle() {
    // GIVEN: A launcher that takes 3s to resolve
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::default();
    let watcher = FakeWatcher::new(&recorder);
    let events = watcher.sender();
    let factory = FakeFactory::new(&recorder);
    let coordinator = StartupCoordinator::new(
        FakeLauncher::resolving(&recorder, 42, Duration::from_secs(3)),
        watcher,
        factory.clone(),
    )
    .with_startup_timeout(TIMEOUT);

    let config = project(dir.path());
    let started = Instant::now();
    let start = coordinator.start_client(&config, noop_handler());
    let signal = async {
        while recorder.count(Step::Launch) == 0 {
            TokioSleep(QUICK).await;
        }
        publish_marker(dir.path(), "7001");
        events.send(marker_event(dir.path())).unwrap();
    };

    // WHEN: The marker appears while the launch is still pending
    let (result, ()) = tokio::join!(start, signal);

    // THEN: Connected promptly, without a process handle
    let connection = result.unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(connection.process, None);
    assert_eq!(factory.calls()[0].port, "7001");
}

// ============================================================================
// Failures
// ============================================================================

/// **VALUE**: Verifies that cache-directory creation failure rejects with the underlying
/// io error and attempts neither watch nor launch.
///
/// **WHY THIS MATTERS**: Without a cache directory there is nowhere for the marker to appear.
/// Launching anyway would leave an orphan server and a hung client.
///
/// **BUG THIS CATCHES**: Would catch if the io error is replaced by a string (losing its
/// kind), or if the coordinator proceeds to watch/launch after the failure.
#[tokio::test]
async fn given_uncreatable_cache_dir_when_start_client_called_then_rejects_with_io_error() {
    // GIVEN: A cache dir path nested under a regular file
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "").unwrap();
    let cache_dir = blocker.join("cache");
    let expected_kind = std::fs::create_dir_all(&cache_dir).unwrap_err().kind();

    let recorder = Recorder::default();
    let coordinator = StartupCoordinator::new(
        FakeLauncher::resolving(&recorder, 42, QUICK),
        FakeWatcher::new(&recorder),
        FakeFactory::new(&recorder),
    );

    // WHEN: Starting the client
    let result = coordinator
        .start_client(&project(&cache_dir), noop_handler())
        .await;

    // THEN: CacheDir with the same io error kind, and no side effects
    match result {
        Err(StartupError::CacheDir { path, source, .. }) => {
            assert_eq!(path, cache_dir);
            assert_eq!(source.kind(), expected_kind);
        }
        other => panic!("Expected CacheDir, got {other:?}"),
    }
    assert!(recorder.steps().is_empty(), "steps: {:?}", recorder.steps());
}

/// **VALUE**: Verifies that a launch failure before the marker appears fails startup.
///
/// **WHY THIS MATTERS**: If the server binary is missing, no marker will ever be written.
/// Ignoring the launch error would hang the editor until the timeout.
#[tokio::test]
async fn given_failing_launch_when_start_client_called_then_returns_startup_failed() {
    // GIVEN: A launcher that fails
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::default();
    let watcher = FakeWatcher::new(&recorder);
    let events = watcher.sender();
    let coordinator = StartupCoordinator::new(
        FakeLauncher::failing(&recorder, QUICK),
        watcher,
        FakeFactory::new(&recorder),
    )
    .with_startup_timeout(TIMEOUT);

    // WHEN: Starting the client
    let result = coordinator
        .start_client(&project(dir.path()), noop_handler())
        .await;

    // THEN: StartupFailed carrying the LaunchError, no connect, watcher released
    match result {
        Err(err @ StartupError::StartupFailed { .. }) => {
            let source = err.source().expect("StartupFailed should carry its cause");
            assert!(source.downcast_ref::<LaunchError>().is_some());
        }
        other => panic!("Expected StartupFailed, got {other:?}"),
    }
    assert_eq!(recorder.count(Step::Connect), 0);
    assert!(events.is_closed());
}

/// **VALUE**: Verifies that startup gives up after the configured timeout.
///
/// **WHY THIS MATTERS**: A server that crashes during startup never writes its marker. Without
/// a timeout the caller's future never resolves.
#[tokio::test]
async fn given_marker_never_appears_when_start_client_called_then_times_out() {
    // GIVEN: A launcher that succeeds but no marker ever appears
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::default();
    let watcher = FakeWatcher::new(&recorder);
    let events = watcher.sender();
    let coordinator = StartupCoordinator::new(
        FakeLauncher::resolving(&recorder, 42, QUICK),
        watcher,
        FakeFactory::new(&recorder),
    )
    .with_startup_timeout(Duration::from_millis(200));

    // WHEN: Starting the client
    let started = Instant::now();
    let result = coordinator
        .start_client(&project(dir.path()), noop_handler())
        .await;

    // THEN: StartupTimeout after roughly the timeout, watcher released, no connect
    match result {
        Err(StartupError::StartupTimeout { timeout, path, .. }) => {
            assert_eq!(timeout, Duration::from_millis(200));
            assert_eq!(path, dir.path().join("http"));
        }
        other => panic!("Expected StartupTimeout, got {other:?}"),
    }
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert_eq!(recorder.count(Step::Connect), 0);
    assert!(events.is_closed());
}

#[tokio::test]
async fn given_unwatchable_marker_when_start_client_called_then_returns_watch_error_without_launch() {
    // GIVEN: A watcher that cannot be installed
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::default();
    let coordinator = StartupCoordinator::new(
        FakeLauncher::resolving(&recorder, 42, QUICK),
        FakeWatcher::failing(&recorder),
        FakeFactory::new(&recorder),
    );

    // WHEN: Starting the client
    let result = coordinator
        .start_client(&project(dir.path()), noop_handler())
        .await;

    // THEN: Watch error, and the launcher was never invoked
    assert!(matches!(
        result,
        Err(StartupError::Watch {
            source: WatchError::Install { .. },
            ..
        })
    ));
    assert_eq!(recorder.steps(), vec![Step::Watch]);
}

#[tokio::test]
async fn given_watcher_backend_error_when_waiting_then_returns_watch_error() {
    // GIVEN: A watcher that reports a backend failure
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::default();
    let watcher = FakeWatcher::new(&recorder);
    let events = watcher.sender();
    events
        .send(Err(WatchError::Backend {
            message: "inotify queue overflow".to_string(),
            location: common::ErrorLocation::caller(),
        }))
        .unwrap();
    let coordinator = StartupCoordinator::new(
        FakeLauncher::resolving(&recorder, 42, Duration::from_secs(1)),
        watcher,
        FakeFactory::new(&recorder),
    )
    .with_startup_timeout(TIMEOUT);

    // WHEN: Starting the client
    let result = coordinator
        .start_client(&project(dir.path()), noop_handler())
        .await;

    // THEN: The backend error surfaces as a Watch error
    assert!(matches!(
        result,
        Err(StartupError::Watch {
            source: WatchError::Backend { .. },
            ..
        })
    ));
    assert_eq!(recorder.count(Step::Connect), 0);
}

/// **VALUE**: Verifies that a watcher stream ending before any marker event fails startup.
///
/// **WHY THIS MATTERS**: A backend that shuts down (unmounted volume, exhausted watch
/// descriptors) will never report the marker. Treating the end of the stream as "keep
/// waiting" turns it into a silent hang until the timeout.
///
/// **BUG THIS CATCHES**: Would catch if the end-of-stream branch is dropped from the wait
/// loop or mapped to something other than a Watch error.
#[tokio::test]
async fn given_watcher_stream_ends_when_waiting_then_returns_watch_closed() {
    // GIVEN: A watcher whose stream ends immediately, and a slow launch
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::default();
    let coordinator = StartupCoordinator::new(
        FakeLauncher::resolving(&recorder, 42, Duration::from_secs(1)),
        FakeWatcher::ending(&recorder),
        FakeFactory::new(&recorder),
    )
    .with_startup_timeout(TIMEOUT);

    // WHEN: Starting the client
    let started = Instant::now();
    let result = coordinator
        .start_client(&project(dir.path()), noop_handler())
        .await;

    // THEN: Watch(Closed) for the marker path, well before the timeout, no connect
    match result {
        Err(StartupError::Watch {
            source: WatchError::Closed { path, .. },
            ..
        }) => assert_eq!(path, dir.path().join("http")),
        other => panic!("Expected Watch(Closed), got {other:?}"),
    }
    assert!(started.elapsed() < TIMEOUT);
    assert_eq!(recorder.count(Step::Connect), 0);
}

/// **VALUE**: Verifies that a marker that appears during the race but does not hold a port
/// fails with MarkerRead and never reaches the connection factory.
///
/// **WHY THIS MATTERS**: A server that writes a status word instead of its port would
/// otherwise send the factory to a bogus endpoint.
#[tokio::test]
async fn given_garbage_marker_published_during_launch_when_start_client_called_then_returns_marker_read() {
    // GIVEN: An empty cache dir and a launcher whose server publishes garbage
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::default();
    let watcher = FakeWatcher::new(&recorder);
    let events = watcher.sender();
    let coordinator = StartupCoordinator::new(
        FakeLauncher::resolving(&recorder, 42, QUICK).publishing(dir.path(), "starting...", QUICK),
        watcher,
        FakeFactory::new(&recorder),
    )
    .with_startup_timeout(TIMEOUT);

    // WHEN: The marker appears and the watcher reports it
    let config = project(dir.path());
    let start = coordinator.start_client(&config, noop_handler());
    let signal = async {
        while !dir.path().join("http").exists() {
            TokioSleep(QUICK).await;
        }
        events.send(marker_event(dir.path())).unwrap();
    };
    let (result, ()) = tokio::join!(start, signal);

    // THEN: MarkerRead, the launcher did run, the factory did not
    assert!(
        matches!(result, Err(StartupError::MarkerRead { .. })),
        "{result:?}"
    );
    assert_eq!(recorder.count(Step::Launch), 1);
    assert_eq!(recorder.count(Step::Connect), 0);
}

/// **VALUE**: Verifies that abandoning `start_client` mid-wait releases the watcher and
/// leaves the launch running.
///
/// **WHY THIS MATTERS**: Editors cancel startup when the user closes the project. A watch
/// that outlives the call leaks an OS handle per attempt.
#[tokio::test]
async fn given_start_client_cancelled_while_waiting_then_watcher_is_released() {
    // GIVEN: A launch that takes a while and a marker that never appears
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::default();
    let watcher = FakeWatcher::new(&recorder);
    let events = watcher.sender();
    let coordinator = StartupCoordinator::new(
        FakeLauncher::resolving(&recorder, 42, Duration::from_millis(300)),
        watcher,
        FakeFactory::new(&recorder),
    )
    .with_startup_timeout(TIMEOUT);

    // WHEN: The caller gives up after 100ms
    let config = project(dir.path());
    let abandoned = tokio::time::timeout(
        Duration::from_millis(100),
        coordinator.start_client(&config, noop_handler()),
    )
    .await;

    // THEN: The watcher is gone at once, and the launch still completes on its own
    assert!(abandoned.is_err());
    assert!(events.is_closed());
    TokioSleep(Duration::from_millis(500)).await;
    assert_eq!(recorder.count(Step::LaunchDone), 1);
    assert_eq!(recorder.count(Step::Connect), 0);
}

/// **VALUE**: Verifies that a connection factory failure is the terminal failure of startup.
#[tokio::test]
async fn given_failing_factory_when_start_client_called_then_propagates_connection_error() {
    // GIVEN: A running server whose handshake fails
    let dir = tempfile::tempdir().unwrap();
    publish_marker(dir.path(), "9090");
    let recorder = Recorder::default();
    let coordinator = StartupCoordinator::new(
        FakeLauncher::resolving(&recorder, 42, QUICK),
        FakeWatcher::new(&recorder),
        FakeFactory::failing(&recorder),
    );

    // WHEN: Starting the client
    let result = coordinator
        .start_client(&project(dir.path()), noop_handler())
        .await;

    // THEN: Connection error, factory called exactly once
    assert!(matches!(result, Err(StartupError::Connection { .. })));
    assert_eq!(recorder.count(Step::Connect), 1);
}
