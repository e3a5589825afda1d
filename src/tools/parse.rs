//! Parsers for external tool output.
//!
//! Tool output is untrusted text. Lines that do not match a known result
//! shape are ignored rather than reported.

use super::OutputFormat;
use crate::types::{Status, ToolFinding};
use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("valid ANSI regex"));

/// `[+] rest of line`
static MARKER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[([+\-x!*])\]\s+(.+?)\s*$").expect("valid marker regex"));

/// Strip terminal color sequences.
pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

/// Parse a tool's stdout into findings, in line order.
pub fn parse_output(format: OutputFormat, stdout: &str) -> Vec<ToolFinding> {
    let clean = strip_ansi(stdout);
    clean
        .lines()
        .filter_map(|line| {
            let finding = parse_line(format, line);
            if finding.is_none() && !line.trim().is_empty() {
                trace!("Ignoring tool line: {}", line);
            }
            finding
        })
        .collect()
}

fn parse_line(format: OutputFormat, line: &str) -> Option<ToolFinding> {
    let caps = MARKER_LINE.captures(line)?;
    let marker = caps.get(1)?.as_str();
    let body = caps.get(2)?.as_str();

    // Legend lines such as "[+] Email used, [-] Email not used" repeat markers.
    if body.contains("[+]") || body.contains("[-]") {
        return None;
    }

    let status = match (format, marker) {
        (_, "+") => Status::Taken,
        (_, "-") => Status::Available,
        (OutputFormat::Holehe, "x") => Status::Unknown,
        (_, "!") => Status::Error,
        _ => return None,
    };

    match format {
        OutputFormat::Holehe => parse_holehe_body(body, status),
        OutputFormat::Bracket => parse_bracket_body(body, status),
    }
}

/// `twitter.com` or `twitter.com / extra info`
fn parse_holehe_body(body: &str, status: Status) -> Option<ToolFinding> {
    let mut parts = body.splitn(2, char::is_whitespace);
    let service = parts.next()?.trim();
    if service.is_empty() {
        return None;
    }
    let extra = parts.next().unwrap_or("").trim().trim_start_matches('/').trim();

    let evidence = match (status, extra.is_empty()) {
        (Status::Unknown, true) => "rate limited".to_string(),
        (_, true) => format!("holehe reported {}", status.to_string().to_lowercase()),
        (_, false) => extra.to_string(),
    };

    Some(ToolFinding {
        service: service.to_string(),
        status,
        evidence,
    })
}

/// `GitHub: https://github.com/user`
fn parse_bracket_body(body: &str, status: Status) -> Option<ToolFinding> {
    let (service, evidence) = body.split_once(": ")?;
    let service = service.trim();
    if service.is_empty() || service.contains('[') {
        return None;
    }

    Some(ToolFinding {
        service: service.to_string(),
        status,
        evidence: evidence.trim().to_string(),
    })
}
