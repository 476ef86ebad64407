//! Configuration file handling for vw-flash

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vwflash_core::{CipherKey, EcuFamily};

use crate::output::OutputFormat;

/// Configuration for the CLI tool
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Log filter directive (e.g. "info", "vwflash_core=debug")
    pub log_filter: Option<String>,
    /// Default output format ("table" or "json")
    pub output: Option<String>,
    /// Disable colored output
    pub no_color: Option<bool>,
    /// Treat checksum actions as Simos12
    pub simos12: Option<bool>,
    /// AES-128 key for the encrypt action, 32 hex digits
    pub encryption_key: Option<String>,
    /// CBC initialisation vector for the encrypt action, 32 hex digits
    pub encryption_iv: Option<String>,
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
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("vw-flash");

        Ok(config_dir.join("config.toml"))
    }

    /// Merge CLI arguments over config file values
    pub fn merge_with_args(
        &self,
        output: Option<OutputFormat>,
        no_color: bool,
        simos12: bool,
        verbose: bool,
    ) -> Result<MergedConfig> {
        let output = match (output, &self.output) {
            (Some(format), _) => format,
            (None, Some(name)) => OutputFormat::from_str(name, true)
                .map_err(|e| anyhow::anyhow!("Invalid output format in config: {}", e))?,
            (None, None) => OutputFormat::default(),
        };

        let family = if simos12 || self.simos12.unwrap_or(false) {
            EcuFamily::Simos12
        } else {
            EcuFamily::Simos18
        };

        let log_filter = if verbose {
            Some("debug".to_string())
        } else {
            self.log_filter.clone()
        };

        let cipher = match (&self.encryption_key, &self.encryption_iv) {
            (Some(key), Some(iv)) => {
                Some(CipherKey::from_hex(key, iv).context("Invalid encryption key in config")?)
            }
            (None, None) => None,
            _ => anyhow::bail!("encryption_key and encryption_iv must be set together"),
        };

        Ok(MergedConfig {
            log_filter,
            output,
            no_color: no_color || self.no_color.unwrap_or(false),
            family,
            cipher,
        })
    }
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone)]
pub struct MergedConfig {
    /// Explicit log filter; `None` falls back to `RUST_LOG`, then "info"
    pub log_filter: Option<String>,
    pub output: OutputFormat,
    pub no_color: bool,
    pub family: EcuFamily,
    /// Key for the encrypt action; `None` uses the bench key
    pub cipher: Option<CipherKey>,
}

impl MergedConfig {
    /// Settings used to report a config file that could not be loaded
    pub fn fallback(verbose: bool) -> Self {
        Self {
            log_filter: verbose.then(|| "debug".to_string()),
            output: OutputFormat::default(),
            no_color: false,
            family: EcuFamily::default(),
            cipher: None,
        }
    }
}
