//! Configuration module for dbdoctor-watch.
//!
//! Handles loading configuration from a TOML file and CLI overrides.

pub mod file;

use std::path::{Path, PathBuf};

use dbdoctor_sdk::config::ChannelConfig;
use dbdoctor_sdk::endpoint::{EndpointError, alerts_endpoint, ensure_socket_url};
use thiserror::Error;
use url::Url;

use crate::config::file::FileConfig;
use crate::output::{OutputConfig, OutputFormat};

/// Used when `--config` is not given. A missing file at this path is not an error.
pub const DEFAULT_CONFIG_PATH: &str = "./dbdoctor-watch.toml";

/// Upper bound for `channel.heartbeat_interval_secs` (one day).
pub const MAX_HEARTBEAT_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("invalid endpoint: {0}")]
    EndpointError(#[from] EndpointError),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    /// Resolved `ws://` or `wss://` URL of the alert stream.
    pub endpoint: Url,
    pub channel: ChannelConfig,
    pub output: OutputConfig,
}

/// Command line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<Url>,
    pub output: Option<OutputFormat>,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    overrides: Overrides,
}

impl ConfigLoader {
    pub fn new(config_path: Option<impl AsRef<Path>>, overrides: Overrides) -> Self {
        Self {
            config_path: config_path.map(|path| path.as_ref().to_path_buf()),
            overrides,
        }
    }

    /// The file this loader reads, if any.
    pub fn source(&self) -> Option<PathBuf> {
        match &self.config_path {
            Some(path) => Some(path.clone()),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                default.exists().then_some(default)
            }
        }
    }

    /// Read the file, apply CLI overrides, validate, and resolve the endpoint.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let file_config = match self.source() {
            Some(path) => {
                let content = std::fs::read_to_string(&path)?;
                toml::from_str(&content)?
            }
            None => FileConfig::default(),
        };
        self.build(file_config)
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    pub fn build(&self, mut file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
        if let Some(url) = &self.overrides.url {
            file_config.endpoint.url = Some(url.clone());
            file_config.endpoint.page_url = None;
        }
        if let Some(format) = self.overrides.output {
            file_config.output.format = format;
        }

        self.validate(&file_config)?;

        let endpoint = match (&file_config.endpoint.url, &file_config.endpoint.page_url) {
            (Some(url), None) => {
                ensure_socket_url(url)?;
                url.clone()
            }
            (None, Some(page_url)) => alerts_endpoint(page_url)?,
            _ => {
                return Err(ConfigError::ValidationError(
                    "exactly one of endpoint.url and endpoint.page_url must be set".to_string(),
                ));
            }
        };

        Ok(LoadedConfig {
            endpoint,
            channel: file_config.channel.to_channel_config(),
            output: file_config.output,
        })
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        let channel = &config.channel;

        if channel.heartbeat_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "channel.heartbeat_interval_secs must be greater than zero".to_string(),
            ));
        }

        if channel.heartbeat_interval_secs > MAX_HEARTBEAT_INTERVAL_SECS {
            return Err(ConfigError::ValidationError(format!(
                "channel.heartbeat_interval_secs must not exceed {MAX_HEARTBEAT_INTERVAL_SECS}"
            )));
        }

        if channel.connect_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "channel.connect_timeout_secs must be greater than zero".to_string(),
            ));
        }

        if channel.reconnect_base_delay_ms == 0 {
            return Err(ConfigError::ValidationError(
                "channel.reconnect_base_delay_ms must be greater than zero".to_string(),
            ));
        }

        if channel.reconnect_base_delay_ms > channel.reconnect_max_delay_secs.saturating_mul(1000)
        {
            return Err(ConfigError::ValidationError(
                "channel.reconnect_base_delay_ms must not exceed channel.reconnect_max_delay_secs"
                    .to_string(),
            ));
        }

        Ok(())
    }
}
