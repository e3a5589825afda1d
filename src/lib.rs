//! mailprobe - Email registration checker.
//!
//! This library finds out which web services an email address is registered on by:
//! - Probing signup/check endpoints of a configurable site catalog
//! - Falling back to installed lookup tools (holehe, maigret, sherlock)
//! - Merging both sources into one deduplicated report
//! - Exporting the report as JSON and/or text
//!
//! # Example
//!
//! ```no_run
//! use mailprobe::{Catalog, ScanConfig, ScanSession, Scanner};
//!
//! #[tokio::main]
//! async fn main() {
//!     let scanner = Scanner::new(ScanConfig::default(), Catalog::builtin()).unwrap();
//!     let mut session = ScanSession::new("jane@example.com");
//!     let report = session.run(&scanner).await.unwrap();
//!     println!("Checked {} services", report.total_checked);
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod export;
pub mod merge;
pub mod notify;
pub mod probe;
pub mod scanner;
pub mod tools;
pub mod types;

#[cfg(test)]
mod testutil;

pub use catalog::Catalog;
pub use config::{Commands, Config, ScanConfig};
pub use export::{ExportFormat, ReportExporter};
pub use scanner::{ScanPhase, ScanSession, Scanner};
pub use types::{
    HttpMethod, MailprobeError, ProbeResult, ReportEntry, Result, ResultSource, ScanReport,
    SiteDescriptor, Status, ToolFinding, ToolResult,
};
