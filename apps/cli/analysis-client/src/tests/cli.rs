use crate::cli::Cli;

use client_core::watcher::WatchMode;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

#[test]
fn given_only_config_when_parsed_then_uses_defaults() {
    // GIVEN/WHEN: The minimal command line
    let cli = Cli::try_parse_from(["analysis-client", "--config", "project.toml"]).unwrap();

    // THEN: Native watching, two minute timeout, default endpoint
    assert_eq!(cli.config, PathBuf::from("project.toml"));
    assert_eq!(cli.watch_mode(), WatchMode::Native);
    assert_eq!(cli.startup_timeout(), Duration::from_secs(120));
    assert!(cli.endpoint.is_none());
    assert!(cli.log_dir().ends_with("analysis-client"));
}

/// **VALUE**: Verifies that `--poll-interval-ms` switches the watcher to polling.
///
/// **WHY THIS MATTERS**: Network filesystems and some containers never deliver native
/// notifications. Without the switch, startup on those hosts always times out.
#[test]
fn given_poll_interval_when_parsed_then_watch_mode_is_poll() {
    let cli = Cli::try_parse_from([
        "analysis-client",
        "--config",
        "project.toml",
        "--poll-interval-ms",
        "40",
        "--startup-timeout-secs",
        "5",
        "--log-dir",
        "/tmp/logs",
    ])
    .unwrap();

    assert_eq!(
        cli.watch_mode(),
        WatchMode::Poll {
            interval: Duration::from_millis(40)
        }
    );
    assert_eq!(cli.startup_timeout(), Duration::from_secs(5));
    assert_eq!(cli.log_dir(), PathBuf::from("/tmp/logs"));
}

#[test]
fn given_missing_config_when_parsed_then_fails() {
    let result = Cli::try_parse_from(["analysis-client"]);

    assert!(result.is_err());
}
