/// Progress of a single `start_client` call.
///
/// `Init -> CheckingMarker -> {Connecting | WatchingAndLaunching}`, then
/// `WatchingAndLaunching -> Connecting`, ending in `Connected` or `Failed`.
/// `CheckingMarker` is never re-entered and nothing follows `Connecting`
/// except a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupState {
    Init,
    CheckingMarker,
    WatchingAndLaunching,
    /// The connection factory has been invoked.
    Connecting,
    Connected,
    Failed,
}

impl StartupState {
    pub fn is_terminal(self) -> bool {
        matches!(self, StartupState::Connected | StartupState::Failed)
    }

    pub fn can_transition_to(self, next: StartupState) -> bool {
        use StartupState::*;

        matches!(
            (self, next),
            (Init, CheckingMarker)
                | (Init, Failed)
                | (CheckingMarker, Connecting)
                | (CheckingMarker, WatchingAndLaunching)
                | (CheckingMarker, Failed)
                | (WatchingAndLaunching, Connecting)
                | (WatchingAndLaunching, Failed)
                | (Connecting, Connected)
                | (Connecting, Failed)
        )
    }
}
