//! Configuration file handling for devdash-decode

use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use devdash_protocol::DeviceId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

/// Configuration for the decode tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Protocol definition document (JSON or YAML)
    pub protocol: Option<PathBuf>,
    /// Decode core frames the definition does not cover
    #[serde(default = "default_fallback")]
    pub fallback: bool,
    /// Default output format
    pub output: Option<String>,
    /// Disable colored output
    pub no_color: Option<bool>,
    /// PD16 modules on the bus
    #[serde(default)]
    pub pd16: Vec<Pd16Config>,
}

/// One `[[pd16]]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pd16Config {
    pub device: DeviceId,
}

fn default_fallback() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            protocol: None,
            fallback: default_fallback(),
            output: None,
            no_color: None,
            pd16: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse TOML configuration text
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("devdash");

        Ok(config_dir.join("config.toml"))
    }

    /// Merge CLI arguments over config file values
    pub fn merge_with_args(&self, args: &ArgOverrides) -> Result<MergedConfig> {
        let output = match (args.output, &self.output) {
            (Some(format), _) => format,
            (None, Some(name)) => OutputFormat::from_str(name, true)
                .map_err(|e| anyhow!("invalid output format in config: {}", e))?,
            (None, None) => OutputFormat::default(),
        };

        let pd16 = if args.pd16.is_empty() {
            self.pd16.iter().map(|p| p.device).collect()
        } else {
            args.pd16.clone()
        };

        Ok(MergedConfig {
            protocol: args.protocol.clone().or_else(|| self.protocol.clone()),
            fallback: self.fallback && !args.no_fallback,
            output,
            no_color: args.no_color || self.no_color.unwrap_or(false),
            pd16,
        })
    }
}

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct ArgOverrides {
    pub protocol: Option<PathBuf>,
    pub no_fallback: bool,
    pub output: Option<OutputFormat>,
    pub no_color: bool,
    pub pd16: Vec<DeviceId>,
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub protocol: Option<PathBuf>,
    pub fallback: bool,
    pub output: OutputFormat,
    pub no_color: bool,
    pub pd16: Vec<DeviceId>,
}
