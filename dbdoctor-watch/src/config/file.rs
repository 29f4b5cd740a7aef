//! TOML file configuration structures.
//!
//! These structs directly map to the `dbdoctor-watch.toml` file format.

use std::time::Duration;

use dbdoctor_sdk::config::{ChannelConfig, ReconnectPolicy};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::output::OutputConfig;

/// Root configuration structure as read from the TOML file.
///
/// Every section is optional so a bare `--url` invocation works without a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub channel: ChannelSection,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where the alert stream lives. Exactly one of the two must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Full `ws://` or `wss://` URL of the alert stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,
    /// Dashboard URL; the stream is derived from its scheme and host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_url: Option<Url>,
}

/// Channel tuning section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSection {
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    #[serde(default = "default_reconnect_max_delay_secs")]
    pub reconnect_max_delay_secs: u64,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

fn default_heartbeat_interval_secs() -> u64 {
    ChannelConfig::DEFAULT_HEARTBEAT_INTERVAL.as_secs()
}

fn default_connect_timeout_secs() -> u64 {
    ChannelConfig::DEFAULT_CONNECT_TIMEOUT.as_secs()
}

fn default_reconnect_base_delay_ms() -> u64 {
    ReconnectPolicy::DEFAULT_BASE_DELAY.as_millis() as u64
}

fn default_reconnect_max_delay_secs() -> u64 {
    ReconnectPolicy::DEFAULT_MAX_DELAY.as_secs()
}

fn default_max_reconnect_attempts() -> u32 {
    ReconnectPolicy::DEFAULT_MAX_ATTEMPTS
}

impl Default for ChannelSection {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_secs: default_reconnect_max_delay_secs(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }
}

impl ChannelSection {
    pub fn to_channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            reconnect: ReconnectPolicy {
                base_delay: Duration::from_millis(self.reconnect_base_delay_ms),
                max_delay: Duration::from_secs(self.reconnect_max_delay_secs),
                max_attempts: self.max_reconnect_attempts,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use dbdoctor_sdk::objects::AlertSeverity;

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[endpoint]
url = "wss://dbdoctor.example.com/ws/alerts"

[channel]
heartbeat_interval_secs = 10
connect_timeout_secs = 5
reconnect_base_delay_ms = 500
reconnect_max_delay_secs = 60
max_reconnect_attempts = 4

[output]
format = "json"
min_severity = "WARNING"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.endpoint.url.as_ref().map(Url::as_str),
            Some("wss://dbdoctor.example.com/ws/alerts")
        );
        assert!(config.endpoint.page_url.is_none());
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.min_severity, Some(AlertSeverity::Warning));

        let channel = config.channel.to_channel_config();
        assert_eq!(channel.heartbeat_interval, Duration::from_secs(10));
        assert_eq!(channel.connect_timeout, Duration::from_secs(5));
        assert_eq!(channel.reconnect.base_delay, Duration::from_millis(500));
        assert_eq!(channel.reconnect.max_delay, Duration::from_secs(60));
        assert_eq!(channel.reconnect.max_attempts, 4);
    }

    #[test]
    fn test_defaults_match_channel_defaults() {
        let config: FileConfig = toml::from_str(
            r#"
[endpoint]
page_url = "https://dbdoctor.example.com/"
"#,
        )
        .unwrap();

        assert_eq!(config.channel.to_channel_config(), ChannelConfig::default());
        assert_eq!(config.output, OutputConfig::default());
    }

    #[test]
    fn test_empty_file_is_valid_toml() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_rejects_bad_url() {
        let result: Result<FileConfig, _> = toml::from_str(
            r#"
[endpoint]
url = "not a url"
"#,
        );
        assert!(result.is_err());
    }
}
