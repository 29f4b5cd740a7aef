//! Channel configuration.

use std::time::Duration;

use super::ReconnectPolicy;

/// Runtime settings for one alert channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// How often `ping` is sent while the connection is open.
    pub heartbeat_interval: Duration,
    /// Upper bound on a single connection attempt, handshake included.
    pub connect_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl ChannelConfig {
    pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Self::DEFAULT_HEARTBEAT_INTERVAL,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            reconnect: ReconnectPolicy::default(),
        }
    }
}
