//! Report export to JSON and text files.

use crate::types::{MailprobeError, ReportEntry, Result, ResultSource, ScanReport, Status};
use chrono::{DateTime, Local};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Which files an export produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Txt,
    Both,
    None,
}

/// Metadata for a report file on disk.
#[derive(Debug, Clone)]
pub struct ReportFile {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
}

/// Writes scan reports into a reports directory.
#[derive(Debug, Clone)]
pub struct ReportExporter {
    reports_dir: PathBuf,
}

impl ReportExporter {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
        }
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Export using the current time for the file name.
    pub fn export(&self, report: &ScanReport, format: ExportFormat) -> Result<Vec<PathBuf>> {
        self.export_at(report, format, Local::now())
    }

    /// Export with an explicit file-name timestamp. Existing files are never
    /// overwritten.
    pub fn export_at(
        &self,
        report: &ScanReport,
        format: ExportFormat,
        at: DateTime<Local>,
    ) -> Result<Vec<PathBuf>> {
        let extensions: &[&str] = match format {
            ExportFormat::Json => &["json"],
            ExportFormat::Txt => &["txt"],
            ExportFormat::Both => &["json", "txt"],
            ExportFormat::None => return Ok(Vec::new()),
        };

        if !self.reports_dir.exists() {
            fs::create_dir_all(&self.reports_dir)?;
            info!("Created reports directory: {}", self.reports_dir.display());
        }

        let mut written = Vec::with_capacity(extensions.len());
        for ext in extensions {
            let path = self.reports_dir.join(report_file_name(&report.email, at, ext));
            let content = match *ext {
                "json" => serde_json::to_string_pretty(report)?,
                _ => render_text(report),
            };
            write_new(&path, &content)?;
            debug!("Wrote report {}", path.display());
            written.push(path);
        }

        Ok(written)
    }

    /// Report files in the reports directory, newest name first.
    pub fn list_reports(&self) -> Result<Vec<ReportFile>> {
        if !self.reports_dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.reports_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !(name.ends_with(".json") || name.ends_with(".txt")) {
                continue;
            }
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            files.push(ReportFile {
                name,
                path: entry.path(),
                size: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Local>::from),
            });
        }

        files.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(files)
    }
}

/// Replace '@' with `_at_` and every other non-alphanumeric char with '_'.
pub fn sanitize_email(email: &str) -> String {
    let mut out = String::with_capacity(email.len() + 3);
    for c in email.chars() {
        match c {
            '@' => out.push_str("_at_"),
            c if c.is_ascii_alphanumeric() => out.push(c),
            _ => out.push('_'),
        }
    }
    out
}

/// `email_scan_<sanitized>_<YYYYmmdd_HHMMSS>.<ext>`
pub fn report_file_name(email: &str, at: DateTime<Local>, ext: &str) -> String {
    format!(
        "email_scan_{}_{}.{}",
        sanitize_email(email),
        at.format("%Y%m%d_%H%M%S"),
        ext
    )
}

fn write_new(path: &Path, content: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => MailprobeError::FileExists(path.to_path_buf()),
            _ => MailprobeError::ExportError(format!("{}: {}", path.display(), e)),
        })?;

    file.write_all(content.as_bytes())
        .map_err(|e| MailprobeError::ExportError(format!("{}: {}", path.display(), e)))
}

/// Human-readable, sectioned rendering of a report.
pub fn render_text(report: &ScanReport) -> String {
    let mut out = String::new();
    let rule = "=".repeat(50);
    let divider = "-".repeat(50);

    let _ = writeln!(out, "Email Scan Report");
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out);
    let _ = writeln!(out, "Email:         {}", report.email);
    let _ = writeln!(
        out,
        "Scan date:     {}",
        report.scan_timestamp.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(out, "Total checked: {}", report.total_checked);
    let _ = writeln!(out);

    let _ = writeln!(out, "Summary");
    let _ = writeln!(out, "{}", divider);
    for status in [Status::Taken, Status::Available, Status::Unknown, Status::Error] {
        let _ = writeln!(out, "  {:<10} {}", format!("{}:", status), report.count(status));
    }
    let _ = writeln!(out);

    let (probes, tools): (Vec<&ReportEntry>, Vec<&ReportEntry>) = report
        .results
        .iter()
        .partition(|e| e.source == ResultSource::Probe);

    write_section(&mut out, "Direct probes", &probes, &divider);
    write_section(&mut out, "External tools", &tools, &divider);

    out
}

fn write_section(out: &mut String, title: &str, entries: &[&ReportEntry], divider: &str) {
    let _ = writeln!(out, "{} ({})", title, entries.len());
    let _ = writeln!(out, "{}", divider);
    if entries.is_empty() {
        let _ = writeln!(out, "  (none)");
        let _ = writeln!(out);
        return;
    }
    for entry in entries {
        let _ = writeln!(out, "Website: {}", entry.website);
        let _ = writeln!(out, "Status:  {}", entry.status);
        if !entry.url.is_empty() {
            let _ = writeln!(out, "URL:     {}", entry.url);
        }
        if !entry.description.is_empty() {
            let _ = writeln!(out, "Info:    {}", entry.description);
        }
        let _ = writeln!(out, "Message: {}", entry.message);
        let _ = writeln!(out, "{}", divider);
    }
    let _ = writeln!(out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn report() -> ScanReport {
        let at = Local.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        ScanReport {
            email: "jane.doe-x@example.com".to_string(),
            scan_timestamp: at,
            total_checked: 2,
            results: vec![
                ReportEntry {
                    website: "Spotify".to_string(),
                    url: "https://www.spotify.com/de/signup/".to_string(),
                    description: "Music".to_string(),
                    status: Status::Taken,
                    message: "API reports a registered account".to_string(),
                    timestamp: at,
                    source: ResultSource::Probe,
                },
                ReportEntry {
                    website: "GitHub".to_string(),
                    url: "https://github.com/jane.doe-x".to_string(),
                    description: "Reported by sherlock".to_string(),
                    status: Status::Taken,
                    message: "https://github.com/jane.doe-x".to_string(),
                    timestamp: at,
                    source: ResultSource::Tool {
                        name: "sherlock".to_string(),
                    },
                },
            ],
        }
    }

    #[test]
    fn test_sanitize_email() {
        assert_eq!(sanitize_email("jane.doe-x@example.com"), "jane_doe_x_at_example_com");
    }

    #[test]
    fn test_report_file_name() {
        let at = Local.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        assert_eq!(
            report_file_name("a@b.io", at, "json"),
            "email_scan_a_at_b_io_20250314_092653.json"
        );
    }

    #[test]
    fn test_export_both_creates_dir_and_files() {
        let tmp = tempfile::tempdir().unwrap();
        let exporter = ReportExporter::new(tmp.path().join("reports"));
        let report = report();

        let paths = exporter
            .export_at(&report, ExportFormat::Both, report.scan_timestamp)
            .unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].to_string_lossy().ends_with(".json"));
        assert!(paths[1].to_string_lossy().ends_with(".txt"));

        let json = fs::read_to_string(&paths[0]).unwrap();
        let parsed: ScanReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.results, report.results);

        let text = fs::read_to_string(&paths[1]).unwrap();
        assert!(text.contains("Direct probes (1)"));
        assert!(text.contains("External tools (1)"));
        assert!(text.contains("Website: GitHub"));
    }

    #[test]
    fn test_export_never_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let exporter = ReportExporter::new(tmp.path());
        let report = report();

        exporter
            .export_at(&report, ExportFormat::Json, report.scan_timestamp)
            .unwrap();
        let err = exporter
            .export_at(&report, ExportFormat::Json, report.scan_timestamp)
            .unwrap_err();
        assert!(matches!(err, MailprobeError::FileExists(_)));
    }

    #[test]
    fn test_export_twice_different_timestamps() {
        let tmp = tempfile::tempdir().unwrap();
        let exporter = ReportExporter::new(tmp.path());
        let report = report();
        let later = report.scan_timestamp + chrono::Duration::seconds(1);

        let first = exporter
            .export_at(&report, ExportFormat::Json, report.scan_timestamp)
            .unwrap();
        let second = exporter.export_at(&report, ExportFormat::Json, later).unwrap();
        assert_ne!(first[0], second[0]);

        let a: ScanReport = serde_json::from_str(&fs::read_to_string(&first[0]).unwrap()).unwrap();
        let b: ScanReport = serde_json::from_str(&fs::read_to_string(&second[0]).unwrap()).unwrap();
        assert_eq!(a.results, b.results);
    }

    #[test]
    fn test_export_none_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let exporter = ReportExporter::new(tmp.path().join("reports"));
        let paths = exporter.export(&report(), ExportFormat::None).unwrap();
        assert!(paths.is_empty());
        assert!(!tmp.path().join("reports").exists());
    }

    #[test]
    fn test_list_reports() {
        let tmp = tempfile::tempdir().unwrap();
        let exporter = ReportExporter::new(tmp.path());
        let report = report();
        exporter
            .export_at(&report, ExportFormat::Both, report.scan_timestamp)
            .unwrap();
        fs::write(tmp.path().join("notes.md"), "ignored").unwrap();

        let files = exporter.list_reports().unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].name.ends_with(".txt"));
        assert!(files.iter().all(|f| f.size > 0));
    }

    #[test]
    fn test_list_reports_missing_dir() {
        let exporter = ReportExporter::new("/nonexistent/mailprobe-reports");
        assert!(exporter.list_reports().unwrap().is_empty());
    }
}
