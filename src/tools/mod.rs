//! External OSINT tool fallback.
//!
//! This module handles:
//! - Detecting which lookup tools are installed
//! - Running them as bounded subprocesses
//! - Parsing their text output into findings

pub mod parse;
pub mod runner;

pub use parse::parse_output;
pub use runner::ToolRunner;

use serde::{Deserialize, Serialize};

/// What a tool is given as its positional argument.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolTarget {
    /// The full email address.
    Email,
    /// The local part of the email, before '@'.
    Username,
}

/// Line format a tool prints its results in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `[+] domain.com` style (holehe).
    Holehe,
    /// `[+] Site: evidence` style (sherlock, maigret).
    Bracket,
}

/// An external lookup tool and how to invoke it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: String,
    pub program: String,
    pub target: ToolTarget,
    pub format: OutputFormat,
    /// Flags placed before the target argument.
    pub args: Vec<String>,
}

impl ToolSpec {
    /// Resolve the argument this tool receives for the given email.
    pub fn target_for<'a>(&self, email: &'a str) -> &'a str {
        match self.target {
            ToolTarget::Email => email,
            ToolTarget::Username => username_of(email),
        }
    }
}

/// Local part of an email address.
pub fn username_of(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_of() {
        assert_eq!(username_of("jane.doe@example.com"), "jane.doe");
        assert_eq!(username_of("nodomain"), "nodomain");
    }

    #[test]
    fn test_target_for() {
        let tool = ToolSpec {
            name: "sherlock".to_string(),
            program: "sherlock".to_string(),
            target: ToolTarget::Username,
            format: OutputFormat::Bracket,
            args: vec![],
        };
        assert_eq!(tool.target_for("jane@example.com"), "jane");
    }
}
