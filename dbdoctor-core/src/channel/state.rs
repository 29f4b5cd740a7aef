/// Lifecycle of an alert channel.
///
/// ```text
/// Idle --connect--> Connecting --opened--> Open
///                       ^                    |
///                       |                 closed
///                    timer                   v
///                       +----------- Reconnecting --attempts exhausted--> GivenUp
/// ```
///
/// `disconnect` returns to `Idle` from any state; `connect` leaves any state
/// for `Connecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelState {
    #[default]
    Idle,
    Connecting,
    Open,
    /// Waiting for the backoff timer before the next attempt.
    Reconnecting,
    /// Retry budget exhausted. Only an explicit `connect` leaves this state.
    GivenUp,
}

impl ChannelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelState::Idle => "idle",
            ChannelState::Connecting => "connecting",
            ChannelState::Open => "open",
            ChannelState::Reconnecting => "reconnecting",
            ChannelState::GivenUp => "given_up",
        }
    }
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot published by the driver after every processed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelStatus {
    pub state: ChannelState,
    pub reconnect_attempts: u32,
}
