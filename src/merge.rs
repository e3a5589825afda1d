//! Merging of direct probe results and external tool findings.
//!
//! Probe results always come first and always win: a tool finding for a
//! service that was probed directly is dropped. Tool findings are then
//! deduplicated among themselves by service name.

use crate::types::{ProbeResult, ReportEntry, ResultSource, Status, ToolFinding, ToolResult};
use chrono::{DateTime, Local};
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// Lowercased, trimmed service name without a leading `www.`.
pub fn service_key(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    match lowered.strip_prefix("www.") {
        Some(stripped) => stripped.to_string(),
        None => lowered,
    }
}

/// Key used to match tool findings against probed sites.
///
/// `Spotify`, `spotify.com` and `www.Spotify.com` share the key `spotify`.
/// Names that are not bare domains are compared lowercased as-is.
pub fn name_key(name: &str) -> String {
    let key = service_key(name);

    if key.contains('.') && !key.contains(char::is_whitespace) {
        if let Some((label, _)) = key.split_once('.') {
            if !label.is_empty() {
                return label.to_string();
            }
        }
    }

    key
}

/// Build the ordered result list for a report.
pub fn merge(probes: Vec<ProbeResult>, tool_results: Vec<ToolResult>) -> Vec<ReportEntry> {
    let probed: HashSet<String> = probes.iter().map(|p| name_key(&p.website)).collect();

    let mut entries: Vec<ReportEntry> = probes.into_iter().map(ReportEntry::from).collect();
    let probe_count = entries.len();

    // Key -> index into `entries` for tool-sourced rows.
    let mut tool_index: HashMap<String, usize> = HashMap::new();

    for result in tool_results {
        for finding in result.findings {
            if finding.service.trim().is_empty() {
                continue;
            }

            if probed.contains(&name_key(&finding.service)) {
                trace!(
                    "Dropping {} finding for {}: probed directly",
                    result.tool_name,
                    finding.service
                );
                continue;
            }

            // Tools are only deduplicated on the full name: `mail.ru` and
            // `mail.com` are different services.
            let key = service_key(&finding.service);
            let entry = tool_entry(&result.tool_name, finding, result.finished_at);

            match tool_index.get(&key) {
                Some(&idx) => {
                    let existing = &entries[idx];
                    if !existing.status.is_conclusive() && entry.status.is_conclusive() {
                        trace!("Upgrading {} with {} result", existing.website, entry.status);
                        entries[idx] = entry;
                    }
                }
                None => {
                    tool_index.insert(key, entries.len());
                    entries.push(entry);
                }
            }
        }
    }

    trace!(
        "Merged {} probe results and {} tool findings",
        probe_count,
        entries.len() - probe_count
    );

    entries
}

fn tool_entry(tool_name: &str, finding: ToolFinding, at: DateTime<Local>) -> ReportEntry {
    let url = if finding.evidence.starts_with("http://") || finding.evidence.starts_with("https://")
    {
        finding.evidence.clone()
    } else {
        String::new()
    };

    ReportEntry {
        website: finding.service.trim().to_string(),
        url,
        description: format!("Reported by {}", tool_name),
        status: finding.status,
        message: finding.evidence,
        timestamp: at,
        source: ResultSource::Tool {
            name: tool_name.to_string(),
        },
    }
}

/// Whether any result is a positive registration signal.
pub fn has_registrations(entries: &[ReportEntry]) -> bool {
    entries.iter().any(|e| e.status == Status::Taken)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(name: &str, status: Status) -> ProbeResult {
        ProbeResult {
            website: name.to_string(),
            url: format!("https://{}.example/signup", name.to_lowercase()),
            description: String::new(),
            status,
            message: "probed".to_string(),
            timestamp: Local::now(),
        }
    }

    fn tool(name: &str, findings: Vec<(&str, Status, &str)>) -> ToolResult {
        ToolResult {
            tool_name: name.to_string(),
            target: "jane".to_string(),
            findings: findings
                .into_iter()
                .map(|(service, status, evidence)| ToolFinding {
                    service: service.to_string(),
                    status,
                    evidence: evidence.to_string(),
                })
                .collect(),
            raw_exit_code: Some(0),
            finished_at: Local::now(),
        }
    }

    #[test]
    fn test_name_key() {
        assert_eq!(name_key("Spotify"), "spotify");
        assert_eq!(name_key("spotify.com"), "spotify");
        assert_eq!(name_key("www.Spotify.com"), "spotify");
        assert_eq!(name_key(" GitHub "), "github");
        assert_eq!(name_key("Hacker News"), "hacker news");
    }

    #[test]
    fn test_service_key() {
        assert_eq!(service_key("www.Mail.ru "), "mail.ru");
        assert_eq!(service_key("GitHub"), "github");
    }

    #[test]
    fn test_tools_keep_services_sharing_a_label() {
        let merged = merge(
            vec![],
            vec![tool(
                "holehe",
                vec![
                    ("mail.ru", Status::Taken, ""),
                    ("mail.com", Status::Taken, ""),
                    ("last.fm", Status::Taken, ""),
                    ("last.com", Status::Taken, ""),
                ],
            )],
        );
        let names: Vec<&str> = merged.iter().map(|e| e.website.as_str()).collect();
        assert_eq!(names, vec!["mail.ru", "mail.com", "last.fm", "last.com"]);
    }

    #[test]
    fn test_probes_come_first_in_order() {
        let merged = merge(
            vec![probe("B", Status::Taken), probe("A", Status::Available)],
            vec![tool("sherlock", vec![("GitHub", Status::Taken, "https://github.com/jane")])],
        );
        let names: Vec<&str> = merged.iter().map(|e| e.website.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "GitHub"]);
        assert_eq!(merged[0].source, ResultSource::Probe);
        assert_eq!(merged[2].url, "https://github.com/jane");
        assert_eq!(merged[2].description, "Reported by sherlock");
    }

    #[test]
    fn test_probe_wins_over_tool_case_insensitive() {
        let probes = vec![probe("Spotify", Status::Available)];
        let expected = ReportEntry::from(probes[0].clone());
        let merged = merge(
            probes,
            vec![tool(
                "holehe",
                vec![
                    ("SPOTIFY", Status::Taken, "x"),
                    ("spotify.com", Status::Taken, "y"),
                ],
            )],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0], expected);
    }

    #[test]
    fn test_tool_duplicates_collapse_to_conclusive() {
        let merged = merge(
            vec![],
            vec![
                tool("holehe", vec![("www.twitter.com", Status::Unknown, "rate limited")]),
                tool("sherlock", vec![("Twitter.com", Status::Taken, "https://twitter.com/jane")]),
                tool("maigret", vec![("twitter.com", Status::Available, "Not Found")]),
            ],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].status, Status::Taken);
        assert_eq!(
            merged[0].source,
            ResultSource::Tool {
                name: "sherlock".to_string()
            }
        );
    }

    #[test]
    fn test_empty_service_names_are_dropped() {
        let merged = merge(vec![], vec![tool("x", vec![("  ", Status::Taken, "")])]);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_every_entry_has_name_and_status() {
        let merged = merge(
            vec![probe("Spotify", Status::Error)],
            vec![tool("sherlock", vec![("sherlock", Status::Error, "timed out")])],
        );
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().all(|e| !e.website.is_empty()));
        assert!(!has_registrations(&merged));
    }
}
