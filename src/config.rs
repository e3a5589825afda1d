//! Command-line configuration.

use crate::export::ExportFormat;
use crate::types::HttpConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Check whether an email address is registered on web services.
#[derive(Parser, Debug, Clone)]
#[command(name = "mailprobe")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Runs the interactive menu when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Do not print the banner
    #[arg(long, global = true)]
    pub no_banner: bool,

    /// Site catalog file (TOML)
    #[arg(long, env = "MAILPROBE_SITES", global = true)]
    pub sites: Option<PathBuf>,

    /// Directory reports are written to
    #[arg(long, env = "MAILPROBE_REPORTS_DIR", default_value = "reports", global = true)]
    pub reports_dir: PathBuf,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Scan an email address
    Scan(ScanConfig),
    /// List configured sites and lookup tools
    Sites,
    /// List exported reports
    Reports,
}

/// Configuration for the scan command.
#[derive(Parser, Debug, Clone)]
pub struct ScanConfig {
    /// Email address to check
    pub email: String,

    /// Report format to export
    #[arg(short, long, value_enum, default_value = "json")]
    pub export: ExportFormat,

    /// Delay between site probes in milliseconds
    #[arg(long, default_value = "1000")]
    pub delay_ms: u64,

    /// HTTP request timeout in seconds
    #[arg(long, default_value = "15")]
    pub timeout: u64,

    /// Timeout per external tool in seconds
    #[arg(long, default_value = "120")]
    pub tool_timeout: u64,

    /// Skip the external tool fallback
    #[arg(long)]
    pub skip_tools: bool,

    /// Custom User-Agent string
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Quiet mode: only print the final report
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(skip)]
    pub verbose: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            email: String::new(),
            export: ExportFormat::Json,
            delay_ms: 1000,
            timeout: 15,
            tool_timeout: 120,
            skip_tools: false,
            user_agent: None,
            quiet: false,
            verbose: false,
        }
    }
}

impl ScanConfig {
    /// Get HTTP configuration from scan config.
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            timeout_secs: self.timeout,
            user_agent: self
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            delay_ms: self.delay_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scan_command() {
        let config = Config::try_parse_from([
            "mailprobe",
            "scan",
            "jane@example.com",
            "--export",
            "both",
            "--delay-ms",
            "250",
            "--skip-tools",
            "--no-banner",
        ])
        .unwrap();

        assert!(config.no_banner);
        match config.command {
            Some(Commands::Scan(scan)) => {
                assert_eq!(scan.email, "jane@example.com");
                assert_eq!(scan.export, ExportFormat::Both);
                assert_eq!(scan.delay_ms, 250);
                assert!(scan.skip_tools);
                assert_eq!(scan.tool_timeout, 120);
            }
            other => panic!("expected scan command, got {:?}", other),
        }
    }

    #[test]
    fn test_no_subcommand_is_interactive() {
        let config = Config::try_parse_from(["mailprobe", "-v"]).unwrap();
        assert!(config.command.is_none());
        assert!(config.verbose);
        assert_eq!(config.reports_dir, PathBuf::from("reports"));
    }

    #[test]
    fn test_rejects_unknown_export_format() {
        let result = Config::try_parse_from(["mailprobe", "scan", "a@b.io", "--export", "xml"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_http_config_defaults_user_agent() {
        let config = ScanConfig::default();
        let http = config.http_config();
        assert_eq!(http.timeout_secs, 15);
        assert_eq!(http.delay_ms, 1000);
        assert!(http.user_agent.starts_with("Mozilla/5.0"));
    }
}
