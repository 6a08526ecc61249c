//! Configuration Module
//!
//! Provides TOML-based configuration for periscan.
//! Configuration is optional - CLI arguments can override file settings.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::export::OutputFormat;
use crate::geo::GeoSettings;
use crate::periodicity::DEFAULT_TOLERANCE;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub intel: IntelConfig,
    pub geo: GeoSettings,
    pub output: OutputConfig,
}

impl Config {
    /// Loads configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Loads configuration from file if it exists, otherwise returns defaults
    pub fn load_or_default(path: Option<&Path>) -> Self {
        match path {
            Some(p) => Self::load(p).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Generates a default configuration file content
    pub fn generate_default() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config)
            .unwrap_or_else(|_| "# Failed to generate config".to_string())
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.analysis.tolerance <= 0.0 || self.analysis.tolerance >= 1.0 {
            anyhow::bail!("tolerance must be between 0.0 and 1.0");
        }
        if self.intel.cache_capacity == 0 {
            anyhow::bail!("intel cache_capacity must be greater than 0");
        }
        if self.geo.enabled && self.geo.country_db.is_none() && self.geo.asn_db.is_none() {
            anyhow::bail!("geo enrichment enabled but no database path configured");
        }
        Ok(())
    }
}

/// Analysis-related configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Tolerance fraction for the periodicity tests (smaller = stricter)
    pub tolerance: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Threat-intel collaborator configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IntelConfig {
    /// Enable indicator matching
    pub enabled: bool,
    /// Path to a local indicator file (JSON, ips + domains)
    pub indicator_file: Option<String>,
    /// Bounded lookup-cache capacity
    pub cache_capacity: usize,
}

impl Default for IntelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            indicator_file: None,
            cache_capacity: 4096,
        }
    }
}

/// Output-related configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format (text, json, jsonl)
    #[serde(with = "output_format_serde")]
    pub format: OutputFormat,
    /// Output file path (None = stdout)
    pub file: Option<String>,
    /// Enable verbose logging
    pub verbose: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            file: None,
            verbose: false,
        }
    }
}

/// Custom serde implementation for OutputFormat
mod output_format_serde {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(format: &OutputFormat, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OutputFormat, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
