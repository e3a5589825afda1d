//! Core types and errors for the email scanner.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during scanning.
#[derive(Error, Debug)]
pub enum MailprobeError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Catalog parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Tool not installed: {0}")]
    ToolUnavailable(String),

    #[error("{tool} timed out after {secs}s")]
    ToolTimeout { tool: String, secs: u64 },

    #[error("{tool} exited with {}", .code.map_or_else(|| "a signal".to_string(), |c| format!("code {}", c)))]
    ToolFailure { tool: String, code: Option<i32> },

    #[error("Report file already exists: {}", .0.display())]
    FileExists(PathBuf),

    #[error("Export failed: {0}")]
    ExportError(String),

    #[error("Invalid scan state: {0}")]
    InvalidState(String),
}

pub type Result<T> = std::result::Result<T, MailprobeError>;

/// Registration status of an email on a single service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// No account uses the email.
    Available,
    /// An account is registered with the email.
    Taken,
    /// The response carried no usable signal.
    Unknown,
    /// The check itself failed.
    Error,
}

impl Status {
    /// Whether the status is a definitive answer rather than a failed or inconclusive check.
    pub fn is_conclusive(self) -> bool {
        matches!(self, Status::Available | Status::Taken)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Available => "Available",
            Status::Taken => "Taken",
            Status::Unknown => "Unknown",
            Status::Error => "Error",
        };
        f.write_str(label)
    }
}

/// HTTP method used to submit the email to a check endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl std::str::FromStr for HttpMethod {
    type Err = MailprobeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            other => Err(MailprobeError::ConfigError(format!(
                "unsupported HTTP method '{}' (expected GET or POST)",
                other
            ))),
        }
    }
}

/// JSON body rule: a numeric field whose value decides the status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonStatusRule {
    #[serde(default = "default_json_status_field")]
    pub field: String,
    #[serde(default)]
    pub taken: Vec<i64>,
    #[serde(default)]
    pub available: Vec<i64>,
}

fn default_json_status_field() -> String {
    "status".to_string()
}

/// A web service whose signup/check endpoint is probed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteDescriptor {
    pub name: String,
    /// Public signup page, shown in reports.
    pub url: String,
    /// Endpoint the email is submitted to.
    pub check_url: String,
    pub method: HttpMethod,
    /// Query parameter or form field carrying the email.
    pub data_field: String,
    #[serde(default)]
    pub description: String,
    /// Lowercase substrings meaning the email is registered.
    #[serde(default)]
    pub taken_markers: Option<Vec<String>>,
    /// Lowercase substrings meaning the email is free.
    #[serde(default)]
    pub available_markers: Option<Vec<String>>,
    #[serde(default)]
    pub json_status: Option<JsonStatusRule>,
}

/// Result of probing one site for one email.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeResult {
    pub website: String,
    pub url: String,
    pub description: String,
    pub status: Status,
    pub message: String,
    pub timestamp: DateTime<Local>,
}

/// One service-level result reported by an external lookup tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolFinding {
    pub service: String,
    pub status: Status,
    pub evidence: String,
}

/// Output of a single external tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub tool_name: String,
    pub target: String,
    pub findings: Vec<ToolFinding>,
    /// `None` when the process was killed or terminated by a signal.
    pub raw_exit_code: Option<i32>,
    pub finished_at: DateTime<Local>,
}

/// Where a merged result came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResultSource {
    /// Direct HTTP probe of a configured site.
    Probe,
    /// Parsed output of an external tool.
    Tool { name: String },
}

/// A merged, origin-agnostic result row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportEntry {
    pub website: String,
    pub url: String,
    pub description: String,
    pub status: Status,
    pub message: String,
    pub timestamp: DateTime<Local>,
    pub source: ResultSource,
}

impl From<ProbeResult> for ReportEntry {
    fn from(probe: ProbeResult) -> Self {
        Self {
            website: probe.website,
            url: probe.url,
            description: probe.description,
            status: probe.status,
            message: probe.message,
            timestamp: probe.timestamp,
            source: ResultSource::Probe,
        }
    }
}

/// The complete, ordered result set for one email scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanReport {
    pub email: String,
    pub scan_timestamp: DateTime<Local>,
    pub total_checked: usize,
    pub results: Vec<ReportEntry>,
}

impl ScanReport {
    /// Number of results with the given status.
    pub fn count(&self, status: Status) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// Results that came from external tools.
    pub fn tool_entries(&self) -> impl Iterator<Item = &ReportEntry> {
        self.results
            .iter()
            .filter(|r| matches!(r.source, ResultSource::Tool { .. }))
    }
}

/// Configuration for HTTP requests.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Minimum spacing between consecutive probes.
    pub delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            user_agent: "Mozilla/5.0 (compatible; mailprobe/0.1)".to_string(),
            delay_ms: 1000,
        }
    }
}
