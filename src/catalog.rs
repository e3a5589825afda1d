//! Site and tool catalog loading.
//!
//! The catalog is read once at startup, either from a TOML file or from the
//! built-in defaults. Every record is validated up front so that a malformed
//! catalog aborts the run before any request is sent.

use crate::tools::{OutputFormat, ToolSpec, ToolTarget};
use crate::types::{HttpMethod, JsonStatusRule, MailprobeError, Result, SiteDescriptor};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up in the working and user config directories.
pub const CATALOG_FILE_NAME: &str = "sites.toml";

/// Raw on-disk catalog layout.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    sites: Vec<SiteRecord>,
    /// Absent table keeps the built-in tools; an explicit empty list disables them.
    tools: Option<Vec<ToolRecord>>,
}

#[derive(Debug, Deserialize)]
struct SiteRecord {
    name: String,
    url: String,
    check_url: String,
    method: String,
    data_field: String,
    #[serde(default)]
    description: String,
    taken_markers: Option<Vec<String>>,
    available_markers: Option<Vec<String>>,
    json_status: Option<JsonStatusRule>,
}

#[derive(Debug, Deserialize)]
struct ToolRecord {
    name: String,
    program: String,
    target: ToolTarget,
    format: OutputFormat,
    #[serde(default)]
    args: Vec<String>,
}

/// Sites to probe and tools to fall back on.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub sites: Vec<SiteDescriptor>,
    pub tools: Vec<ToolSpec>,
}

impl Catalog {
    /// Load and validate a catalog file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MailprobeError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| MailprobeError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    /// Parse and validate catalog TOML.
    pub fn parse(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)?;

        let sites = file
            .sites
            .into_iter()
            .map(SiteRecord::into_descriptor)
            .collect::<Result<Vec<_>>>()?;

        let tools = match file.tools {
            Some(records) => records
                .into_iter()
                .map(ToolRecord::into_spec)
                .collect::<Result<Vec<_>>>()?,
            None => builtin_tools(),
        };

        let catalog = Self { sites, tools };
        catalog.validate()?;
        Ok(catalog)
    }

    /// The default catalog shipped with the binary.
    pub fn builtin() -> Self {
        Self {
            sites: builtin_sites(),
            tools: builtin_tools(),
        }
    }

    /// Pick the catalog: explicit path, then `./sites.toml`, then the user
    /// config directory, then the built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        for candidate in default_locations() {
            if candidate.is_file() {
                debug!("Using catalog at {:?}", candidate);
                return Self::load(&candidate);
            }
        }

        debug!("No catalog file found, using built-in sites");
        Ok(Self::builtin())
    }

    fn validate(&self) -> Result<()> {
        if self.sites.is_empty() {
            return Err(MailprobeError::ConfigError(
                "catalog defines no sites".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for site in &self.sites {
            if !seen.insert(site.name.to_lowercase()) {
                return Err(MailprobeError::ConfigError(format!(
                    "duplicate site name '{}'",
                    site.name
                )));
            }
        }

        Ok(())
    }
}

impl SiteRecord {
    fn into_descriptor(self) -> Result<SiteDescriptor> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(MailprobeError::ConfigError(
                "site with empty name".to_string(),
            ));
        }
        if self.data_field.trim().is_empty() {
            return Err(MailprobeError::ConfigError(format!(
                "site '{}' has an empty data_field",
                name
            )));
        }

        let method: HttpMethod = self.method.parse()?;

        for (field, value) in [("url", &self.url), ("check_url", &self.check_url)] {
            url::Url::parse(value).map_err(|e| {
                MailprobeError::ConfigError(format!("site '{}' has invalid {}: {}", name, field, e))
            })?;
        }

        Ok(SiteDescriptor {
            name,
            url: self.url,
            check_url: self.check_url,
            method,
            data_field: self.data_field,
            description: self.description,
            taken_markers: self.taken_markers.map(lowercase_all),
            available_markers: self.available_markers.map(lowercase_all),
            json_status: self.json_status,
        })
    }
}

impl ToolRecord {
    fn into_spec(self) -> Result<ToolSpec> {
        if self.name.trim().is_empty() || self.program.trim().is_empty() {
            return Err(MailprobeError::ConfigError(
                "tool needs both a name and a program".to_string(),
            ));
        }

        Ok(ToolSpec {
            name: self.name.trim().to_string(),
            program: self.program,
            target: self.target,
            format: self.format,
            args: self.args,
        })
    }
}

fn lowercase_all(markers: Vec<String>) -> Vec<String> {
    markers.into_iter().map(|m| m.to_lowercase()).collect()
}

fn default_locations() -> Vec<PathBuf> {
    let mut locations = vec![PathBuf::from(CATALOG_FILE_NAME)];
    if let Some(config_dir) = dirs::config_dir() {
        locations.push(config_dir.join("mailprobe").join(CATALOG_FILE_NAME));
    }
    locations
}

fn builtin_sites() -> Vec<SiteDescriptor> {
    vec![
        SiteDescriptor {
            name: "Spotify".to_string(),
            url: "https://www.spotify.com/de/signup/".to_string(),
            check_url: "https://spclient.wg.spotify.com/signup/public/v1/account".to_string(),
            method: HttpMethod::Get,
            data_field: "email".to_string(),
            description: "Music streaming (signup validation API)".to_string(),
            taken_markers: Some(vec![
                "bereits ein konto".to_string(),
                "already an account".to_string(),
                "already registered".to_string(),
            ]),
            available_markers: None,
            json_status: Some(JsonStatusRule {
                field: "status".to_string(),
                taken: vec![20],
                available: vec![1],
            }),
        },
        SiteDescriptor {
            name: "OnlyFans".to_string(),
            url: "https://onlyfans.com/".to_string(),
            check_url: "https://onlyfans.com/".to_string(),
            method: HttpMethod::Post,
            data_field: "email".to_string(),
            description: "Creator platform (signup form)".to_string(),
            taken_markers: Some(vec![
                "bitte geben sie eine andere e-mail-adresse ein".to_string(),
                "email is already taken".to_string(),
                "email already exists".to_string(),
                "already registered".to_string(),
            ]),
            available_markers: None,
            json_status: None,
        },
    ]
}

fn builtin_tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "holehe".to_string(),
            program: "holehe".to_string(),
            target: ToolTarget::Email,
            format: OutputFormat::Holehe,
            args: Vec::new(),
        },
        ToolSpec {
            name: "maigret".to_string(),
            program: "maigret".to_string(),
            target: ToolTarget::Username,
            format: OutputFormat::Bracket,
            args: vec![
                "--timeout".to_string(),
                "10".to_string(),
                "--print-found".to_string(),
            ],
        },
        ToolSpec {
            name: "sherlock".to_string(),
            program: "sherlock".to_string(),
            target: ToolTarget::Username,
            format: OutputFormat::Bracket,
            args: vec!["--timeout".to_string(), "10".to_string()],
        },
    ]
}
