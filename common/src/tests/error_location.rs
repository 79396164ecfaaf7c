use crate::ErrorLocation;

use std::panic::Location;

#[track_caller]
fn raise_here() -> ErrorLocation {
    ErrorLocation::caller()
}

/// **VALUE**: Verifies that `ErrorLocation::from()` captures file, line and column.
///
/// **WHY THIS MATTERS**: Every error in the workspace embeds an ErrorLocation. If it
/// records the wrong position, startup failures point developers at the wrong code.
///
/// **BUG THIS CATCHES**: Would catch if the file path or line capture breaks.
#[test]
fn given_location_caller_when_error_location_created_then_captures_file_line_column() {
    // GIVEN: The current source position
    let expected_line = line!() + 3;

    // WHEN: Creating ErrorLocation from it
    let location = ErrorLocation::from(Location::caller());

    // THEN: File, line and column are recorded
    assert!(location.file.contains("error_location.rs"));
    assert_eq!(location.line, expected_line);
    assert!(location.column > 0);
}

/// **VALUE**: Verifies that `ErrorLocation::caller()` reports the call site of a
/// `#[track_caller]` helper rather than the helper body.
///
/// **BUG THIS CATCHES**: Would catch if `#[track_caller]` is removed from `caller()`,
/// which would make every error point into `error_location.rs` in the common crate.
#[test]
fn given_track_caller_helper_when_caller_called_then_reports_call_site() {
    // GIVEN / WHEN: Raising through a track_caller helper
    let expected_line = line!() + 1;
    let location = raise_here();

    // THEN: The line is the one in this test
    assert_eq!(location.line, expected_line);
}

/// **VALUE**: Verifies the `[file:line:column]` display format.
///
/// **WHY THIS MATTERS**: Error messages append the location verbatim; tests across the
/// workspace look for the file name inside the rendered message.
#[test]
fn given_error_location_when_formatted_then_produces_bracketed_format() {
    // GIVEN: A fixed location
    let location = ErrorLocation {
        file: "startup.rs",
        line: 42,
        column: 7,
    };

    // WHEN: Formatting it
    let formatted = location.to_string();

    // THEN: Bracketed, colon-separated
    assert_eq!(formatted, "[startup.rs:42:7]");
}
