//! Configuration loading for the resolution core
//!
//! Loads the theme, device-rule and service-registration configuration
//! from TOML. Every pattern and regular expression is compiled during
//! conversion, so malformed configuration fails the load rather than a
//! later request.

mod types;

pub use types::*;

use crate::registry::RegisteredService;
use crate::resolver::{DeviceRule, DEFAULT_THEME_NAME};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Validated resolution-core configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Theme used when no override source produces a value
    pub default_theme: String,
    /// Host header (case-insensitive) to theme name
    pub host_header_themes: HashMap<String, String>,
    /// Device-classification rules, evaluated in configured order
    pub device_rules: Vec<DeviceRule>,
    /// Registered services, evaluated in configured order
    pub services: Vec<RegisteredService>,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Load configuration from a string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Self::from_raw(raw)
    }

    /// Convert from raw TOML config to validated config
    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let themes = raw.themes.unwrap_or_default();

        let device_rules = raw
            .device_rules
            .into_iter()
            .map(|r| r.try_into())
            .collect::<Result<Vec<_>, _>>()?;

        let services = raw
            .services
            .into_iter()
            .map(|s| s.try_into())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            default_theme: themes
                .default
                .unwrap_or_else(|| DEFAULT_THEME_NAME.to_string()),
            host_header_themes: themes.host_overrides,
            device_rules,
            services,
        })
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            default_theme: DEFAULT_THEME_NAME.to_string(),
            host_header_themes: HashMap::new(),
            device_rules: Vec::new(),
            services: Vec::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
