//! Configuration management for `jumplinks-core`.
//!
//! `ResolverConfig` carries the module settings the resolver needs: cleaning
//! policy, the extension list behind the `ext` wildcard, legacy domain
//! fallback and timeouts. It is loaded from YAML, validated once, and then
//! passed explicitly to the resolver.
//!
//! License: MIT OR APACHE 2.0

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::errors::JumplinksError;
use crate::slug::SlugCleaner;
use crate::wildcards::{WildcardRegistry, DEFAULT_EXTENSIONS};

/// How captured wildcard values are cleaned before substitution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CleaningPolicy {
    /// Slug and lower-case.
    #[default]
    FullClean,
    /// Slug, keep case.
    SemiClean,
    /// Leave values as captured.
    NoClean,
}

impl CleaningPolicy {
    pub fn cleans(&self) -> bool {
        !matches!(self, CleaningPolicy::NoClean)
    }

    pub fn preserves_case(&self) -> bool {
        matches!(self, CleaningPolicy::SemiClean)
    }
}

/// Top-level resolver settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolverConfig {
    pub wildcard_cleaning: CleaningPolicy,
    /// Split TitleCase, acronyms and letter/digit runs while cleaning.
    pub enhanced_wildcard_cleaning: bool,
    /// Space-separated list behind the `ext` wildcard. Inserted verbatim.
    pub extensions: String,
    /// Old host probed when no rule matches. Empty disables the probe.
    pub legacy_domain: String,
    /// Legacy probe statuses that allow a redirect. Accepts a list or a
    /// space/comma separated string.
    #[serde(deserialize_with = "deserialize_status_codes")]
    pub status_codes: Vec<u16>,
    pub root_url: String,
    #[serde(rename = "enable404Monitor")]
    pub enable_404_monitor: bool,
    /// Evaluate and trace without recording hits.
    pub dry_run: bool,
    pub legacy_probe_timeout_ms: u64,
    pub store_timeout_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            wildcard_cleaning: CleaningPolicy::FullClean,
            enhanced_wildcard_cleaning: false,
            extensions: DEFAULT_EXTENSIONS.to_string(),
            legacy_domain: String::new(),
            status_codes: vec![200, 301, 302],
            root_url: "/".to_string(),
            enable_404_monitor: false,
            dry_run: false,
            legacy_probe_timeout_ms: 5000,
            store_timeout_ms: 2000,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StatusCodesRepr {
    List(Vec<u16>),
    Single(u16),
    Text(String),
}

fn deserialize_status_codes<'de, D>(deserializer: D) -> std::result::Result<Vec<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    match StatusCodesRepr::deserialize(deserializer)? {
        StatusCodesRepr::List(codes) => Ok(codes),
        StatusCodesRepr::Single(code) => Ok(vec![code]),
        StatusCodesRepr::Text(text) => parse_status_codes(&text).map_err(serde::de::Error::custom),
    }
}

/// Splits a status code list on spaces and/or commas.
pub fn parse_status_codes(text: &str) -> std::result::Result<Vec<u16>, JumplinksError> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u16>()
                .map_err(|_| JumplinksError::InvalidConfig(format!("'{}' is not a status code", part)))
        })
        .collect()
}

impl ResolverConfig {
    /// Loads and validates a configuration file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading resolver configuration from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml_str(&text)
            .with_context(|| format!("Failed to load config file {}", path.display()))?;
        Ok(config)
    }

    /// Parses and validates YAML configuration text.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: ResolverConfig = serde_yml::from_str(text).context("Failed to parse resolver configuration")?;
        config.validate()?;
        debug!(
            "Resolver configuration loaded: cleaning={:?}, enhanced={}, legacy='{}'",
            config.wildcard_cleaning, config.enhanced_wildcard_cleaning, config.legacy_domain
        );
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), JumplinksError> {
        let mut errors = Vec::new();

        for code in &self.status_codes {
            if !(100..=599).contains(code) {
                errors.push(format!("status code {} is outside 100-599", code));
            }
        }

        let legacy = self.legacy_domain.trim();
        if !legacy.is_empty() && !(legacy.starts_with("http://") || legacy.starts_with("https://")) {
            errors.push(format!("legacy domain '{}' must start with http:// or https://", legacy));
        }

        if !self.root_url.starts_with('/') || !self.root_url.ends_with('/') {
            errors.push(format!("root URL '{}' must start and end with '/'", self.root_url));
        }

        if self.extensions.split_whitespace().next().is_none() {
            errors.push("extension list is empty".to_string());
        }

        if !errors.is_empty() {
            return Err(JumplinksError::InvalidConfig(errors.join("; ")));
        }

        self.wildcard_registry().validate()
    }

    pub fn wildcard_registry(&self) -> WildcardRegistry {
        WildcardRegistry::new(&self.extensions)
    }

    pub fn slug_cleaner(&self) -> SlugCleaner {
        SlugCleaner::new(self.enhanced_wildcard_cleaning)
    }

    /// The trimmed legacy domain, if the fallback probe is enabled.
    pub fn legacy_domain(&self) -> Option<&str> {
        let legacy = self.legacy_domain.trim();
        (!legacy.is_empty()).then_some(legacy)
    }

    pub fn legacy_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.legacy_probe_timeout_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}
