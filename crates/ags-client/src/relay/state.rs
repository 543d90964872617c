use std::fmt;

/// Lifecycle of the relay connection as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Disconnecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEvent {
    ConnectRequested,
    /// First body bytes of a poll arrived.
    BodyStarted,
    PollFailed,
    DisconnectRequested,
    /// The poll loop has exited after a disconnect.
    Stopped,
}

impl ConnectionState {
    /// Next state, or `None` when `event` is not valid in this state.
    pub fn on(self, event: RelayEvent) -> Option<ConnectionState> {
        use ConnectionState::*;
        use RelayEvent::*;
        match (self, event) {
            (Idle, ConnectRequested) => Some(Connecting),
            (Connecting, BodyStarted) => Some(Connected),
            (Connected, BodyStarted) => Some(Connected),
            (Connecting | Connected, PollFailed) => Some(Idle),
            (Connecting | Connected, DisconnectRequested) => Some(Disconnecting),
            (Disconnecting, Stopped) => Some(Idle),
            _ => None,
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Idle => "Not connected",
            ConnectionState::Connecting => "...connecting...",
            ConnectionState::Connected => "Connected",
            ConnectionState::Disconnecting => "...disconnecting...",
        })
    }
}

/// Stages a single receive request moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PollStage {
    Unsent,
    Opened,
    HeadersReceived,
    Loading,
    Done,
}
