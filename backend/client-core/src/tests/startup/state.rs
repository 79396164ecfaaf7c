// Unit tests for the startup state machine transition table

use crate::startup::StartupState;
use crate::startup::StartupState::*;

const ALL: [StartupState; 6] = [
    Init,
    CheckingMarker,
    WatchingAndLaunching,
    Connecting,
    Connected,
    Failed,
];

/// **VALUE**: Verifies both startup paths are legal end to end.
///
/// **WHY THIS MATTERS**: The coordinator debug-asserts every transition. If the table
/// rejects a path the coordinator actually takes, every debug build panics on startup.
#[test]
fn given_fast_and_race_paths_when_walked_then_every_step_is_allowed() {
    // GIVEN: The two happy paths
    let fast = [Init, CheckingMarker, Connecting, Connected];
    let race = [
        Init,
        CheckingMarker,
        WatchingAndLaunching,
        Connecting,
        Connected,
    ];

    // WHEN / THEN: Each consecutive pair is a legal transition
    for path in [&fast[..], &race[..]] {
        for step in path.windows(2) {
            assert!(
                step[0].can_transition_to(step[1]),
                "{:?} -> {:?} should be allowed",
                step[0],
                step[1]
            );
        }
    }
}

/// **VALUE**: Verifies that the marker is never re-checked once startup moved past it.
///
/// **BUG THIS CATCHES**: Would catch a refactor that loops back to CheckingMarker after the
/// watcher is installed, reintroducing a second fast-path read and a double connect.
#[test]
fn given_any_state_when_transitioning_to_checking_marker_then_only_init_allowed() {
    for state in ALL {
        assert_eq!(
            state.can_transition_to(CheckingMarker),
            state == Init,
            "{state:?} -> CheckingMarker"
        );
    }
}

/// **VALUE**: Verifies that after the connection factory is invoked only a terminal state
/// may follow.
#[test]
fn given_connecting_when_transitioning_then_only_terminal_states_allowed() {
    for next in ALL {
        assert_eq!(
            Connecting.can_transition_to(next),
            next.is_terminal(),
            "Connecting -> {next:?}"
        );
    }
}

#[test]
fn given_terminal_state_when_transitioning_then_nothing_allowed() {
    for terminal in [Connected, Failed] {
        for next in ALL {
            assert!(!terminal.can_transition_to(next), "{terminal:?} -> {next:?}");
        }
    }
}

#[test]
fn given_watching_when_transitioning_to_connected_then_must_pass_connecting() {
    assert!(!WatchingAndLaunching.can_transition_to(Connected));
    assert!(WatchingAndLaunching.can_transition_to(Connecting));
}
