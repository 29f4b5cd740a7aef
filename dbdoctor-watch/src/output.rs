//! Rendering alerts to stdout.

use std::io::Write;

use dbdoctor_sdk::objects::{AlertMessage, AlertSeverity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One human-readable line per alert.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Output section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Hide alerts below this severity. Alerts with an unrecognised
    /// severity are always shown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_severity: Option<AlertSeverity>,
}

/// Listener body that writes accepted alerts to stdout.
#[derive(Debug, Clone)]
pub struct AlertPrinter {
    config: OutputConfig,
}

impl AlertPrinter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn accepts(&self, alert: &AlertMessage) -> bool {
        match (self.config.min_severity, alert.severity_level()) {
            (Some(min), Some(level)) => level >= min,
            _ => true,
        }
    }

    /// The line to print for `alert`, or `None` if it is filtered out.
    pub fn render(&self, alert: &AlertMessage) -> anyhow::Result<Option<String>> {
        if !self.accepts(alert) {
            return Ok(None);
        }
        let line = match self.config.format {
            OutputFormat::Text => format_text(alert),
            OutputFormat::Json => serde_json::to_string(alert)?,
        };
        Ok(Some(line))
    }

    pub fn print(&self, alert: &AlertMessage) -> anyhow::Result<()> {
        if let Some(line) = self.render(alert)? {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{line}")?;
            stdout.flush()?;
        }
        Ok(())
    }
}

fn format_text(alert: &AlertMessage) -> String {
    format!(
        "[{}] {} rule={} id={} at={}: {}",
        alert.severity.to_ascii_uppercase(),
        alert.status.to_ascii_uppercase(),
        alert.rule_name,
        alert.id,
        alert.triggered_at,
        alert.message
    )
}
