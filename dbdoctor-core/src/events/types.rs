//! Input and command types for the channel driver.
//!
//! Inputs are produced by the socket and timer tasks and carry the id of the
//! connection or timer they belong to. The state machine compares that id
//! with the one it currently tracks and ignores anything stale.

use url::Url;

/// Identifies one connection attempt. A new id is allocated for every open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

/// Identifies one scheduled timer (reconnect or heartbeat).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The socket could not be established (refused, DNS, TLS, handshake).
    ConnectFailed(String),
    /// The handshake did not finish within the connect timeout.
    ConnectTimedOut,
    /// The server closed the connection, with its close code if it sent one.
    Remote(Option<u16>),
    /// The connection failed after it was open.
    Transport(String),
    /// This side closed the connection.
    Local,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::ConnectFailed(e) => write!(f, "connect failed: {e}"),
            CloseReason::ConnectTimedOut => write!(f, "connect timed out"),
            CloseReason::Remote(Some(code)) => write!(f, "closed by server (code {code})"),
            CloseReason::Remote(None) => write!(f, "closed by server"),
            CloseReason::Transport(e) => write!(f, "transport error: {e}"),
            CloseReason::Local => write!(f, "closed locally"),
        }
    }
}

/// Something that happened to the connection or a timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelInput {
    /// The socket finished its handshake.
    Opened(ConnectionId),
    /// A text frame arrived.
    Frame(ConnectionId, String),
    /// The socket is gone, whether it ever opened or not.
    Closed(ConnectionId, CloseReason),
    /// A one-shot or repeating timer elapsed.
    TimerFired(TimerId),
}

/// Operation requested through a [`ChannelHandle`](crate::runtime::ChannelHandle).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCommand {
    Connect(Url),
    Disconnect,
    Send(String),
}
