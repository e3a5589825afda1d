//! Colored console output for scan progress and results.

use crate::catalog::Catalog;
use crate::export::ReportFile;
use crate::tools::ToolSpec;
use crate::types::{ProbeResult, ResultSource, ScanReport, Status, ToolResult};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

/// Console output handler with colors and formatting.
pub struct ConsoleOutput {
    verbose: bool,
    quiet: bool,
}

impl ConsoleOutput {
    /// Create a new console output handler.
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    /// Print scan start message.
    pub fn print_scan_start(&self, email: &str, site_count: usize) {
        if self.quiet {
            return;
        }

        println!();
        println!("{} Scanning: {}", "[*]".bright_blue(), email.bright_white());
        println!("{} Checking {} sites...", "[*]".bright_blue(), site_count);
    }

    /// Print scan progress (only in verbose mode).
    pub fn print_progress(&self, message: &str) {
        if self.quiet || !self.verbose {
            return;
        }

        println!("{} {}", "[.]".dimmed(), message.dimmed());
    }

    /// Print one probe outcome as it completes.
    pub fn print_probe_result(&self, index: usize, total: usize, result: &ProbeResult) {
        if self.quiet {
            return;
        }

        println!(
            "  {:>2}/{} {:<20} {}",
            index,
            total,
            result.website,
            format_status(result.status)
        );
    }

    /// Print which lookup tools will run.
    pub fn print_tools_detected(&self, tools: &[&ToolSpec]) {
        if self.quiet {
            return;
        }

        if tools.is_empty() {
            self.print_progress("No external lookup tools installed");
            return;
        }

        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        println!(
            "{} Running lookup tools: {}",
            "[*]".bright_blue(),
            names.join(", ")
        );
    }

    /// Print the outcome of a tool run.
    pub fn print_tool_result(&self, result: &ToolResult) {
        if self.quiet {
            return;
        }

        let taken = result
            .findings
            .iter()
            .filter(|f| f.status == Status::Taken)
            .count();
        let failed = result.findings.len() == 1 && result.findings[0].status == Status::Error;

        if failed {
            println!(
                "  {} {} {}",
                "[!]".yellow(),
                result.tool_name,
                "failed".yellow()
            );
        } else {
            println!(
                "  {} {} reported {} services ({} registered)",
                "[+]".green(),
                result.tool_name,
                result.findings.len(),
                taken
            );
        }
    }

    /// Print the merged report as a table followed by a summary.
    pub fn print_report(&self, report: &ScanReport) {
        if report.results.is_empty() {
            println!("{}", "No results to display.".yellow());
            return;
        }

        println!();
        println!("{}", "=== Scan Results ===".bright_cyan());
        println!(
            "  {:<22} {:<10} {:<10} {}",
            "Website".bold(),
            "Status".bold(),
            "Source".bold(),
            "Message".bold()
        );

        for entry in &report.results {
            let source = match &entry.source {
                ResultSource::Probe => "probe".to_string(),
                ResultSource::Tool { name } => name.clone(),
            };
            println!(
                "  {:<22} {:<10} {:<10} {}",
                entry.website.bright_white(),
                format_status(entry.status),
                source.dimmed(),
                entry.message
            );
            if self.verbose && !entry.url.is_empty() {
                println!("  {:<22} {}", "", entry.url.dimmed());
            }
        }

        self.print_summary(report);
    }

    /// Print scan summary.
    pub fn print_summary(&self, report: &ScanReport) {
        println!();
        println!("{}", "=== Summary ===".bright_cyan());
        println!("  Email:      {}", report.email);
        println!("  Checked:    {}", report.total_checked);
        println!(
            "  Taken:      {}",
            report.count(Status::Taken).to_string().red()
        );
        println!(
            "  Available:  {}",
            report.count(Status::Available).to_string().green()
        );
        println!(
            "  Unknown:    {}",
            report.count(Status::Unknown).to_string().white()
        );
        println!(
            "  Errors:     {}",
            report.count(Status::Error).to_string().yellow()
        );
        println!();
    }

    /// Print paths of exported files.
    pub fn print_exported(&self, paths: &[PathBuf]) {
        for path in paths {
            println!(
                "{} Report exported: {}",
                "[+]".green(),
                path.display().to_string().bright_white()
            );
        }
    }

    /// Print the configured sites and tools.
    pub fn print_catalog(&self, catalog: &Catalog) {
        println!();
        println!(
            "{}",
            format!("=== Sites ({}) ===", catalog.sites.len()).bright_cyan()
        );
        for site in &catalog.sites {
            println!("  {:<20} {}", site.name.bright_white(), site.url);
            if self.verbose && !site.description.is_empty() {
                println!("  {:<20} {}", "", site.description.dimmed());
            }
        }

        println!();
        println!(
            "{}",
            format!("=== Lookup tools ({}) ===", catalog.tools.len()).bright_cyan()
        );
        for tool in &catalog.tools {
            let installed = if which::which(&tool.program).is_ok() {
                "installed".green()
            } else {
                "missing".dimmed()
            };
            println!("  {:<20} {:<10} {}", tool.name.bright_white(), installed, tool.program);
        }
        println!();
    }

    /// Print the exported report files.
    pub fn print_reports(&self, files: &[ReportFile]) {
        if files.is_empty() {
            println!("{}", "No reports found.".yellow());
            return;
        }

        println!();
        println!("{}", "=== Reports ===".bright_cyan());
        for file in files {
            let modified = file
                .modified
                .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            println!(
                "  {:<60} {:>10} {}",
                file.name.bright_white(),
                format!("{} B", file.size),
                modified.dimmed()
            );
        }
        println!();
    }

    /// Create a progress bar.
    pub fn create_progress_bar(&self, total: u64, message: &str) -> Option<ProgressBar> {
        if self.quiet {
            return None;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        pb.set_message(message.to_string());
        Some(pb)
    }
}

/// Format a status with color.
fn format_status(status: Status) -> colored::ColoredString {
    let label = status.to_string();
    match status {
        Status::Taken => label.red().bold(),
        Status::Available => label.green(),
        Status::Unknown => label.white(),
        Status::Error => label.yellow(),
    }
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new(false, false)
    }
}
