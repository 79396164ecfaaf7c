// Unit tests for launch command construction
// Spawning a real process is covered in integration_tests/launcher/command.rs

use crate::config::ServerCommand;
use crate::launcher::command::build_launch_command;

use std::ffi::OsStr;
use std::path::Path;

/// **VALUE**: Verifies that the configured program and arguments reach the command unchanged.
///
/// **BUG THIS CATCHES**: Would catch if args are joined into one string or reordered, which
/// breaks JVM-style launch lines like `java -cp <jar> <main>`.
#[test]
fn given_server_command_when_built_then_program_and_args_match() {
    // GIVEN: A server command with arguments
    let server = ServerCommand::new("java")
        .arg("-classpath")
        .arg("server.jar")
        .arg("org.example.Server");

    // WHEN: Building the command
    let cmd = build_launch_command(&server, Path::new("/work"));

    // THEN: Program and args are preserved in order
    let std_cmd = cmd.as_std();
    assert_eq!(std_cmd.get_program(), "java");
    let args: Vec<&OsStr> = std_cmd.get_args().collect();
    assert_eq!(args, ["-classpath", "server.jar", "org.example.Server"]);
}

#[test]
fn given_no_working_dir_when_built_then_runs_in_project_root() {
    let server = ServerCommand::new("java");

    let cmd = build_launch_command(&server, Path::new("/work"));

    assert_eq!(cmd.as_std().get_current_dir(), Some(Path::new("/work")));
}

#[test]
fn given_working_dir_and_env_when_built_then_both_applied() {
    // GIVEN: Explicit working dir and env
    let server = ServerCommand::new("java")
        .working_dir("/elsewhere")
        .env("ANALYSIS_MODE", "batch");

    // WHEN: Building
    let cmd = build_launch_command(&server, Path::new("/work"));

    // THEN: Working dir overrides the root and env is set
    let std_cmd = cmd.as_std();
    assert_eq!(std_cmd.get_current_dir(), Some(Path::new("/elsewhere")));
    let env: Vec<_> = std_cmd.get_envs().collect();
    assert!(env.contains(&(OsStr::new("ANALYSIS_MODE"), Some(OsStr::new("batch")))));
}
