use client_core::error::launch::LaunchError;
use client_core::launcher::CommandLauncher;
use client_core::{ProjectConfig, ServerCommand, ServerLauncher};

/// **VALUE**: Verifies that launching a real program yields its PID.
///
/// **WHY THIS MATTERS**: The handle is forwarded to the connection factory for diagnostics;
/// a zero or missing PID would make "is the server still running" checks meaningless.
#[cfg(unix)]
#[tokio::test]
async fn given_valid_program_when_launched_then_returns_process_handle() {
    // GIVEN: A project whose server is a short-lived shell command
    let dir = tempfile::tempdir().unwrap();
    let config = ProjectConfig::new("fixture", dir.path(), dir.path().join("cache"))
        .with_server(ServerCommand::new("sh").arg("-c").arg("echo started; sleep 1"));

    // WHEN: Launching
    let handle = CommandLauncher::new().launch(&config).await.unwrap();

    // THEN: A real PID is reported
    assert!(handle.pid() > 0);
}

#[tokio::test]
async fn given_missing_binary_when_launched_then_returns_spawn_error() {
    // GIVEN: A program that does not exist
    let dir = tempfile::tempdir().unwrap();
    let config = ProjectConfig::new("fixture", dir.path(), dir.path().join("cache"))
        .with_server(ServerCommand::new("definitely-not-an-analysis-server-binary"));

    // WHEN: Launching
    let result = CommandLauncher::new().launch(&config).await;

    // THEN: Spawn error naming the program
    match result {
        Err(LaunchError::Spawn { message, .. }) => {
            assert!(message.contains("definitely-not-an-analysis-server-binary"));
        }
        other => panic!("Expected Spawn error, got {other:?}"),
    }
}

#[tokio::test]
async fn given_empty_program_when_launched_then_returns_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = ProjectConfig::new("fixture", dir.path(), dir.path().join("cache"));

    let result = CommandLauncher::new().launch(&config).await;

    assert!(matches!(result, Err(LaunchError::Validation { .. })));
}

/// **VALUE**: Verifies that a server writing a non-UTF-8 line keeps running and keeps its
/// output pipes open.
///
/// **WHY THIS MATTERS**: The server lives for the whole session and logs freely. If the
/// client stops draining a pipe at the first undecodable byte, the server's next write hits
/// a closed pipe and the server dies from SIGPIPE mid-session.
///
/// **BUG THIS CATCHES**: Would catch if output forwarding goes back to UTF-8 line decoding
/// that ends on the first invalid line.
#[cfg(unix)]
#[tokio::test]
async fn given_server_writes_invalid_utf8_when_launched_then_keeps_running() {
    // GIVEN: A server that prints a raw 0xFF byte, then a burst of lines, then idles
    let dir = tempfile::tempdir().unwrap();
    let script = "printf '\\377\\n'; sleep 0.3; \
                  i=0; while [ $i -lt 2000 ]; do echo \"line $i\"; i=$((i+1)); done; \
                  sleep 5";
    let config = ProjectConfig::new("fixture", dir.path(), dir.path().join("cache"))
        .with_server(ServerCommand::new("sh").arg("-c").arg(script));

    // WHEN: Launching and letting it write past the invalid line
    let handle = CommandLauncher::new().launch(&config).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;

    // THEN: It is still alive in its final sleep
    let running = handle.is_running();
    let _ = std::process::Command::new("kill")
        .arg(handle.pid().to_string())
        .status();
    assert!(running, "server {handle} died while writing output");
}

#[cfg(unix)]
#[tokio::test]
async fn given_config_named_by_bare_file_name_when_launched_then_spawns_in_current_dir() {
    // GIVEN: A config read from "project.toml" with no root_dir
    let contents = r#"
name = "fixture"
cache_dir = "cache"

[server]
program = "true"
"#;
    let config =
        ProjectConfig::from_toml_str(contents, std::path::Path::new("project.toml")).unwrap();

    // WHEN: Launching
    let result = CommandLauncher::new().launch(&config).await;

    // THEN: The spawn succeeds from the current directory
    assert!(result.is_ok(), "{result:?}");
}
