// Unit tests for project config loading and validation

use crate::config::{ProjectConfig, ServerCommand, default_cache_dir};
use crate::error::config::ConfigError;

use std::path::{Path, PathBuf};

const FULL_CONFIG: &str = r#"
name = "demo"
root_dir = "project"
cache_dir = ".cache/analysis"

[server]
program = "java"
args = ["-jar", "server.jar"]

[server.env]
JAVA_OPTS = "-Xmx2g"
"#;

/// **VALUE**: Verifies that relative paths in the config resolve against the config file's directory.
///
/// **WHY THIS MATTERS**: Editors start the client from arbitrary working directories. If
/// `cache_dir` resolved against the process cwd, two editors on the same project would watch
/// different marker files and launch two servers.
///
/// **BUG THIS CATCHES**: Would catch if resolution switches to the cwd or drops the base dir.
#[test]
fn given_relative_paths_when_parsed_then_resolved_against_config_dir() {
    // GIVEN: A config that lives in /work
    let origin = Path::new("/work/analysis.toml");

    // WHEN: Parsing it
    let config = ProjectConfig::from_toml_str(FULL_CONFIG, origin).unwrap();

    // THEN: Paths are anchored at /work
    assert_eq!(config.root_dir, PathBuf::from("/work/project"));
    assert_eq!(config.cache_dir, PathBuf::from("/work/.cache/analysis"));
    assert_eq!(config.server.program, "java");
    assert_eq!(config.server.args, vec!["-jar", "server.jar"]);
    assert_eq!(
        config.server.env.get("JAVA_OPTS").map(String::as_str),
        Some("-Xmx2g")
    );
}

/// **VALUE**: Verifies the cache dir default when the config omits one.
///
/// **BUG THIS CATCHES**: Would catch if a missing `cache_dir` becomes an empty path, which
/// would put the marker file in the current directory.
#[test]
fn given_no_cache_dir_when_parsed_then_uses_default_cache_dir() {
    // GIVEN: A config without cache_dir
    let contents = r#"
name = "demo"

[server]
program = "java"
"#;
    let origin = Path::new("/work/analysis.toml");

    // WHEN: Parsing it
    let config = ProjectConfig::from_toml_str(contents, origin).unwrap();

    // THEN: root_dir is the config dir and cache_dir is the computed default
    assert_eq!(config.root_dir, PathBuf::from("/work"));
    assert_eq!(
        config.cache_dir,
        default_cache_dir("demo", Path::new("/work"))
    );
}

#[test]
fn given_empty_program_when_validated_then_returns_validation_error() {
    // GIVEN: A config whose server program is blank
    let config = ProjectConfig::new("demo", "/work", "/work/.cache")
        .with_server(ServerCommand::new("   "));

    // WHEN: Validating
    let result = config.validate();

    // THEN: Validation fails naming the field
    match result {
        Err(ConfigError::ValidationError { reason, .. }) => {
            assert!(reason.contains("server.program"), "got: {reason}");
        }
        other => panic!("Expected ValidationError, got {other:?}"),
    }
}

#[test]
fn given_empty_name_when_validated_then_returns_validation_error() {
    let config =
        ProjectConfig::new("", "/work", "/work/.cache").with_server(ServerCommand::new("java"));

    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValidationError { .. })
    ));
}

/// **VALUE**: Verifies that malformed TOML surfaces as a ParseError with the file path.
///
/// **WHY THIS MATTERS**: The user needs to know which file is broken; a bare toml error
/// message has no path in it.
#[test]
fn given_malformed_toml_when_parsed_then_returns_parse_error_with_path() {
    // GIVEN: Broken TOML
    let origin = Path::new("/work/analysis.toml");

    // WHEN: Parsing
    let result = ProjectConfig::from_toml_str("name = ", origin);

    // THEN: ParseError carrying the origin path
    match result {
        Err(ConfigError::ParseError { path, .. }) => assert_eq!(path, origin),
        other => panic!("Expected ParseError, got {other:?}"),
    }
}

#[test]
fn given_missing_file_when_loaded_then_returns_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.toml");

    let result = ProjectConfig::load(&path);

    assert!(matches!(result, Err(ConfigError::ReadError { .. })));
}

#[test]
fn given_config_file_on_disk_when_loaded_then_round_trips_fields() {
    // GIVEN: A config file in a temp dir
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("analysis.toml");
    std::fs::write(&path, FULL_CONFIG).unwrap();

    // WHEN: Loading it
    let config = ProjectConfig::load(&path).unwrap();

    // THEN: Fields come through and paths are under the temp dir
    assert_eq!(config.name, "demo");
    assert_eq!(config.cache_dir, dir.path().join(".cache/analysis"));
}

/// **VALUE**: Verifies that a config named by bare file name resolves against the current
/// directory instead of an empty path.
///
/// **WHY THIS MATTERS**: `analysis-client -c project.toml` is the normal invocation. An empty
/// `root_dir` becomes the launcher's working directory, and every launch then fails with
/// "No such file or directory" blamed on the server program.
///
/// **BUG THIS CATCHES**: Would catch if the empty parent of a bare file name is used as the
/// base directory again.
#[test]
fn given_bare_file_name_when_parsed_then_root_dir_is_current_dir() {
    // GIVEN: A config without root_dir, read from "project.toml"
    let contents = r#"
name = "demo"
cache_dir = "cache"

[server]
program = "true"
"#;

    // WHEN: Parsing it
    let config = ProjectConfig::from_toml_str(contents, Path::new("project.toml")).unwrap();

    // THEN: Paths hang off "." and are never empty
    assert_eq!(config.root_dir, PathBuf::from("."));
    assert_eq!(config.cache_dir, Path::new(".").join("cache"));
    assert!(!config.root_dir.as_os_str().is_empty());
}
