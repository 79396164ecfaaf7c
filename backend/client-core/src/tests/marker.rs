// Unit tests for marker path and port parsing

use crate::error::StartupError;
use crate::marker::{Port, PortParseError, marker_path, parse_port, read_port};

use std::path::Path;

/// **VALUE**: Verifies that surrounding whitespace and newlines are trimmed before parsing.
///
/// **WHY THIS MATTERS**: Servers commonly write the port with a trailing newline. If the
/// newline reached the parser, every fresh launch would fail with a MarkerRead error.
///
/// **BUG THIS CATCHES**: Would catch if trimming is removed or only trims one side.
#[test]
fn given_padded_marker_content_when_parsed_then_returns_trimmed_port() {
    // GIVEN: Marker content wrapped in whitespace
    let content = " 9090\n";

    // WHEN: Parsing it
    let port = parse_port(content).unwrap();

    // THEN: The port text is exactly "9090"
    assert_eq!(port.to_string(), "9090");
    assert_eq!(port.get(), 9090);
}

#[test]
fn given_crlf_and_tabs_when_parsed_then_still_parses() {
    assert_eq!(parse_port("\t\r\n4096\r\n").unwrap().get(), 4096);
}

#[test]
fn given_blank_marker_when_parsed_then_returns_empty_error() {
    assert_eq!(parse_port("  \n"), Err(PortParseError::Empty));
}

/// **VALUE**: Verifies that non-numeric and out-of-range contents are rejected.
///
/// **BUG THIS CATCHES**: Would catch a permissive parser that truncates "90x" to 90 or wraps
/// 70000 into a valid u16.
#[test]
fn given_invalid_marker_contents_when_parsed_then_returns_invalid_error() {
    for content in ["90x", "70000", "-1", "90 90"] {
        assert!(
            matches!(parse_port(content), Err(PortParseError::Invalid { .. })),
            "Should reject: {content:?}"
        );
    }
}

#[test]
fn given_zero_port_when_parsed_then_returns_zero_error() {
    assert_eq!(parse_port("0"), Err(PortParseError::Zero));
    assert_eq!(Port::new(0), None);
}

#[test]
fn given_cache_dir_when_marker_path_computed_then_appends_http() {
    let path = marker_path(Path::new("/work/.cache"));

    assert_eq!(path, Path::new("/work/.cache/http"));
}

#[tokio::test]
async fn given_marker_on_disk_when_read_then_returns_port() {
    let dir = tempfile::tempdir().unwrap();
    let path = marker_path(dir.path());
    std::fs::write(&path, "8123\n").unwrap();

    let port = read_port(&path).await.unwrap();

    assert_eq!(port.get(), 8123);
}

/// **VALUE**: Verifies that an unparseable marker becomes an explicit MarkerRead error.
///
/// **WHY THIS MATTERS**: A truncated or garbage marker must reject startup rather than
/// hang or panic; the error has to name the marker path so the user can delete it.
#[tokio::test]
async fn given_garbage_marker_when_read_then_returns_marker_read_error() {
    // GIVEN: A marker with non-numeric content
    let dir = tempfile::tempdir().unwrap();
    let path = marker_path(dir.path());
    std::fs::write(&path, "not-a-port").unwrap();

    // WHEN: Reading it
    let result = read_port(&path).await;

    // THEN: MarkerRead naming the path
    match result {
        Err(StartupError::MarkerRead {
            path: err_path,
            message,
            ..
        }) => {
            assert_eq!(err_path, path);
            assert!(message.contains("not-a-port"), "got: {message}");
        }
        other => panic!("Expected MarkerRead, got {other:?}"),
    }
}

#[tokio::test]
async fn given_non_utf8_marker_when_read_then_returns_marker_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = marker_path(dir.path());
    std::fs::write(&path, [0xff, 0xfe, 0x39]).unwrap();

    let result = read_port(&path).await;

    assert!(matches!(result, Err(StartupError::MarkerRead { .. })));
}
