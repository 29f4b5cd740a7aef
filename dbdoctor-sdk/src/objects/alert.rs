use serde::{Deserialize, Serialize};

/// An alert pushed by the server on `/ws/alerts`.
///
/// Mirrors the alert history record the backend broadcasts whenever a rule
/// fires or resolves. `severity` and `status` stay as plain strings so that
/// values this client does not know about still reach listeners; use
/// [`severity_level`](AlertMessage::severity_level) for a typed view.
///
/// ```json
/// {"id":42,"ruleId":7,"ruleName":"slow-query-p99","severity":"CRITICAL",
///  "status":"FIRING","message":"p99 over 2s","triggeredAt":"2024-05-01T10:00:00"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertMessage {
    pub id: i64,
    pub rule_id: i64,
    pub rule_name: String,
    pub severity: String,
    pub status: String,
    #[serde(default)]
    pub message: String,
    /// ISO-8601 local timestamp, e.g. `2024-05-01T10:00:00`.
    pub triggered_at: String,
    /// Metrics snapshot captured when the rule fired (JSON text).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
}

impl AlertMessage {
    pub const STATUS_FIRING: &'static str = "FIRING";
    pub const STATUS_RESOLVED: &'static str = "RESOLVED";

    pub fn is_firing(&self) -> bool {
        self.status.eq_ignore_ascii_case(Self::STATUS_FIRING)
    }

    pub fn is_resolved(&self) -> bool {
        self.status.eq_ignore_ascii_case(Self::STATUS_RESOLVED)
    }

    /// Typed severity, or `None` if the server sent a value outside the
    /// known set.
    pub fn severity_level(&self) -> Option<AlertSeverity> {
        self.severity.parse().ok()
    }
}

/// Alert severities known to the backend, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "INFO",
            AlertSeverity::Warning => "WARNING",
            AlertSeverity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown alert severity: {0}")]
pub struct UnknownSeverity(pub String);

impl std::str::FromStr for AlertSeverity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INFO" => Ok(AlertSeverity::Info),
            "WARNING" | "WARN" => Ok(AlertSeverity::Warning),
            "CRITICAL" => Ok(AlertSeverity::Critical),
            _ => Err(UnknownSeverity(s.to_string())),
        }
    }
}
