//! Raw configuration types for TOML parsing

use super::ConfigError;
use crate::matcher::AccessPattern;
use crate::registry::RegisteredService;
use crate::resolver::DeviceRule;
use serde::Deserialize;
use std::collections::HashMap;

/// Raw configuration as parsed from TOML
#[derive(Debug, Deserialize)]
pub struct RawConfig {
    pub themes: Option<RawThemes>,
    #[serde(default)]
    pub device_rules: Vec<RawDeviceRule>,
    #[serde(default)]
    pub services: Vec<RawService>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawThemes {
    pub default: Option<String>,
    #[serde(default)]
    pub host_overrides: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct RawDeviceRule {
    pub pattern: String,
    pub browser_type: String,
}

impl TryFrom<RawDeviceRule> for DeviceRule {
    type Error = ConfigError;

    fn try_from(raw: RawDeviceRule) -> Result<Self, Self::Error> {
        DeviceRule::new(&raw.pattern, raw.browser_type).map_err(|e| {
            ConfigError::Invalid(format!(
                "Bad device rule pattern '{}': {}",
                raw.pattern, e
            ))
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RawService {
    pub name: String,
    pub service_id: String,
    pub theme: Option<String>,
    pub description: Option<String>,
    pub enabled: Option<bool>,
}

impl TryFrom<RawService> for RegisteredService {
    type Error = ConfigError;

    fn try_from(raw: RawService) -> Result<Self, Self::Error> {
        let pattern = AccessPattern::parse(&raw.service_id).map_err(|e| {
            ConfigError::Invalid(format!(
                "Bad service pattern '{}' for service '{}': {}",
                raw.service_id, raw.name, e
            ))
        })?;

        let mut service = RegisteredService::new(raw.name, pattern);
        if let Some(theme) = raw.theme {
            service = service.with_theme(theme);
        }
        if let Some(description) = raw.description {
            service = service.with_description(description);
        }
        service.enabled = raw.enabled.unwrap_or(true);

        Ok(service)
    }
}
