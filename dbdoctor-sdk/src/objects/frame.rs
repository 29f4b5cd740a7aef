//! Heartbeat frames exchanged on the alert socket.
//!
//! # Protocol
//!
//! 1. While connected, the client sends the bare text frame [`HEARTBEAT_PING`]
//!    on a fixed interval.
//! 2. The server answers each ping with the bare text frame
//!    [`HEARTBEAT_PONG`]. The reply is not JSON and carries no alert.
//! 3. Every other text frame is a JSON-encoded
//!    [`AlertMessage`](super::AlertMessage).

/// Keep-alive frame sent by the client.
pub const HEARTBEAT_PING: &str = "ping";

/// Server reply to [`HEARTBEAT_PING`].
pub const HEARTBEAT_PONG: &str = "pong";

/// Returns `true` if `frame` is the server's heartbeat reply.
///
/// The server compares pings case-insensitively, so replies are matched the
/// same way and surrounding whitespace is ignored.
pub fn is_heartbeat_ack(frame: &str) -> bool {
    frame.trim().eq_ignore_ascii_case(HEARTBEAT_PONG)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_ack_detection() {
        assert!(is_heartbeat_ack("pong"));
        assert!(is_heartbeat_ack("PONG\n"));
        assert!(!is_heartbeat_ack("ping"));
        assert!(!is_heartbeat_ack(r#"{"id":1}"#));
        assert!(!is_heartbeat_ack(""));
    }
}
