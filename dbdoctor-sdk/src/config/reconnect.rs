//! Reconnect policy.

use std::time::Duration;

/// Exponential backoff parameters applied after a connection closes.
///
/// The n-th consecutive reconnect waits `min(base_delay * 2^(n-1), max_delay)`.
/// Once `max_attempts` reconnects have been scheduled without a successful
/// open in between, the channel gives up until it is told to connect again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Self::DEFAULT_BASE_DELAY,
            max_delay: Self::DEFAULT_MAX_DELAY,
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
        }
    }
}
