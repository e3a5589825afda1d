//! Heuristic interpretation of signup/check responses.

use crate::types::{SiteDescriptor, Status};

/// Substrings that indicate the email already has an account.
pub const DEFAULT_TAKEN_MARKERS: &[&str] = &[
    "already exists",
    "already registered",
    "already in use",
    "email taken",
    "email already",
    "account exists",
    "user exists",
    "is taken",
];

/// Substrings that indicate the email is free to register.
pub const DEFAULT_AVAILABLE_MARKERS: &[&str] = &[
    "email is available",
    "\"available\":true",
    "not registered",
    "verification sent",
    "check your email",
];

/// Negated forms of "available". A body containing one of these never counts
/// as an available signal, whatever marker matched.
const NEGATED_AVAILABLE: &[&str] = &["unavailable", "not available", "no longer available"];

/// Status codes whose bodies are worth analysing. Validation endpoints often
/// answer 400/422 for a taken email, and signup forms redirect with 302.
fn is_analysable(code: u16) -> bool {
    (200..300).contains(&code) || matches!(code, 302 | 400 | 422)
}

/// Classify a response into a status and a human-readable message.
pub fn classify(site: &SiteDescriptor, code: u16, body: &str) -> (Status, String) {
    if code == 429 {
        return (Status::Error, "HTTP 429: rate limited".to_string());
    }
    if code >= 500 {
        return (Status::Error, format!("HTTP {}: server error", code));
    }
    if !is_analysable(code) {
        return (Status::Unknown, format!("HTTP {}: unexpected response", code));
    }

    if let Some(verdict) = classify_json_status(site, body) {
        return verdict;
    }

    let lowered = body.to_lowercase();

    if let Some(marker) = find_marker(&lowered, site.taken_markers.as_deref(), DEFAULT_TAKEN_MARKERS) {
        return (
            Status::Taken,
            format!("Response indicates a registered account ('{}')", marker),
        );
    }

    if let Some(negation) = NEGATED_AVAILABLE.iter().find(|n| lowered.contains(*n)) {
        return (
            Status::Unknown,
            format!("HTTP {}: response says '{}'", code, negation),
        );
    }

    if let Some(marker) = find_marker(
        &lowered,
        site.available_markers.as_deref(),
        DEFAULT_AVAILABLE_MARKERS,
    ) {
        return (
            Status::Available,
            format!("Response indicates the email is free ('{}')", marker),
        );
    }

    (
        Status::Unknown,
        format!("HTTP {}: no availability signal in response", code),
    )
}

fn classify_json_status(site: &SiteDescriptor, body: &str) -> Option<(Status, String)> {
    let rule = site.json_status.as_ref()?;
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    let value = json.get(&rule.field)?.as_i64()?;

    if rule.taken.contains(&value) {
        Some((
            Status::Taken,
            format!("API reports a registered account ({} = {})", rule.field, value),
        ))
    } else if rule.available.contains(&value) {
        Some((
            Status::Available,
            format!("API reports the email is free ({} = {})", rule.field, value),
        ))
    } else {
        None
    }
}

/// First configured marker found in the lowercased body. Site-specific markers
/// replace the defaults rather than extending them.
fn find_marker<'a>(
    lowered: &str,
    configured: Option<&'a [String]>,
    defaults: &'a [&'a str],
) -> Option<&'a str> {
    match configured {
        Some(markers) => markers
            .iter()
            .map(String::as_str)
            .find(|m| !m.is_empty() && lowered.contains(m)),
        None => defaults.iter().copied().find(|m| lowered.contains(m)),
    }
}
