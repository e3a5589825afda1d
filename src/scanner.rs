//! Scan orchestration: direct probes, tool fallback, merge and export.

use crate::catalog::Catalog;
use crate::config::ScanConfig;
use crate::export::{ExportFormat, ReportExporter};
use crate::merge::merge;
use crate::notify::ConsoleOutput;
use crate::probe::SiteProber;
use crate::tools::ToolRunner;
use crate::types::{MailprobeError, ProbeResult, Result, ScanReport, SiteDescriptor, ToolResult};
use chrono::Local;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Instant;
use tracing::{debug, info};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

/// Whether `email` looks like a deliverable address.
pub fn validate_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Runs the probe and tool stages for one email at a time.
pub struct Scanner {
    config: ScanConfig,
    sites: Vec<SiteDescriptor>,
    prober: SiteProber,
    tools: ToolRunner,
    console: ConsoleOutput,
}

impl Scanner {
    /// Create a new scanner over a validated catalog.
    pub fn new(config: ScanConfig, catalog: Catalog) -> Result<Self> {
        let prober = SiteProber::new(&config.http_config())?;
        let tools = ToolRunner::new(catalog.tools, config.tool_timeout);
        let console = ConsoleOutput::new(config.verbose, config.quiet);

        Ok(Self {
            config,
            sites: catalog.sites,
            prober,
            tools,
            console,
        })
    }

    pub fn sites(&self) -> &[SiteDescriptor] {
        &self.sites
    }

    /// Probe every site in catalog order, one at a time.
    pub async fn probe_sites(&self, email: &str) -> Vec<ProbeResult> {
        let total = self.sites.len();
        self.console.print_scan_start(email, total);

        let pb = self.console.create_progress_bar(total as u64, "Probing sites");
        let mut results = Vec::with_capacity(total);

        for (i, site) in self.sites.iter().enumerate() {
            if let Some(ref pb) = pb {
                pb.set_message(site.name.clone());
            }

            let result = self.prober.probe(site, email).await;

            match pb {
                Some(ref pb) => {
                    pb.suspend(|| self.console.print_probe_result(i + 1, total, &result));
                    pb.inc(1);
                }
                None => self.console.print_probe_result(i + 1, total, &result),
            }
            results.push(result);
        }

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        results
    }

    /// Run every installed lookup tool sequentially. Tools that are not
    /// installed are skipped without a result.
    pub async fn run_tools(&self, email: &str) -> Vec<ToolResult> {
        if self.config.skip_tools {
            self.console.print_progress("Skipping external lookup tools");
            return Vec::new();
        }

        let installed = self.tools.detect();
        self.console.print_tools_detected(&installed);

        let mut results = Vec::with_capacity(installed.len());
        for tool in installed {
            self.console
                .print_progress(&format!("Running {} (this can take a while)", tool.name));
            if let Some(result) = self.tools.run(tool, email).await {
                self.console.print_tool_result(&result);
                results.push(result);
            }
        }

        results
    }
}

/// Lifecycle of a [`ScanSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Probing,
    ToolFallback,
    Merging,
    Exported,
    /// The scan itself failed; start a new session.
    Failed,
}

/// One scan of one email, from probing through export.
#[derive(Debug)]
pub struct ScanSession {
    email: String,
    phase: ScanPhase,
    report: Option<ScanReport>,
}

impl ScanSession {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into().trim().to_string(),
            phase: ScanPhase::Idle,
            report: None,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    /// The merged report, once the scan has reached `Merging`.
    pub fn report(&self) -> Option<&ScanReport> {
        self.report.as_ref()
    }

    /// Probe all sites, fall back to the lookup tools and merge the results.
    pub async fn run(&mut self, scanner: &Scanner) -> Result<&ScanReport> {
        if self.phase != ScanPhase::Idle {
            return Err(MailprobeError::InvalidState(format!(
                "cannot start a scan from {:?}",
                self.phase
            )));
        }

        if !validate_email(&self.email) {
            self.phase = ScanPhase::Failed;
            return Err(MailprobeError::InvalidEmail(self.email.clone()));
        }

        let start = Instant::now();
        let scan_timestamp = Local::now();

        self.phase = ScanPhase::Probing;
        let probes = scanner.probe_sites(&self.email).await;

        self.phase = ScanPhase::ToolFallback;
        let tool_results = scanner.run_tools(&self.email).await;

        self.phase = ScanPhase::Merging;
        let results = merge(probes, tool_results);
        debug!("Merged report has {} entries", results.len());

        info!(
            "Scan of {} finished in {:.1}s",
            self.email,
            start.elapsed().as_secs_f64()
        );

        let report = ScanReport {
            email: self.email.clone(),
            scan_timestamp,
            total_checked: results.len(),
            results,
        };

        Ok(self.report.insert(report))
    }

    /// Write the report. On failure the session stays where it was, so the
    /// export can be retried.
    pub fn export(
        &mut self,
        exporter: &ReportExporter,
        format: ExportFormat,
    ) -> Result<Vec<PathBuf>> {
        let report = match (self.phase, self.report.as_ref()) {
            (ScanPhase::Merging | ScanPhase::Exported, Some(report)) => report,
            (phase, _) => {
                return Err(MailprobeError::InvalidState(format!(
                    "cannot export from {:?}",
                    phase
                )))
            }
        };

        let paths = exporter.export(report, format)?;
        self.phase = ScanPhase::Exported;
        Ok(paths)
    }
}
