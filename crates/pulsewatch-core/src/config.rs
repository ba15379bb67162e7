//! pulsewatch.toml configuration parser.
//!
//! Configuration is an explicit value: the binary loads it once and hands
//! the pieces each component needs to its constructor.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};
use crate::types::ServiceType;

const DEFAULT_UPDATE_INTERVAL_MINUTES: u64 = 5;
const DEFAULT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_COMMAND_PREFIX: &str = "!";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PulseConfig {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub monitor_channel_id: u64,
    /// `0` is treated the same as absent.
    pub alert_channel_id: Option<u64>,
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            monitor_channel_id: 0,
            alert_channel_id: None,
            command_prefix: default_command_prefix(),
        }
    }
}

impl DiscordConfig {
    /// The alert channel id, if one is configured.
    pub fn alert_channel(&self) -> Option<u64> {
        self.alert_channel_id.filter(|id| *id != 0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Minutes between scheduled checks.
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,
    /// Per-request probe timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            update_interval: DEFAULT_UPDATE_INTERVAL_MINUTES,
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl MonitorConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval.saturating_mul(60))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub url: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl ServiceConfig {
    pub fn new(name: &str, url: &str, kind: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            kind: Some(kind.to_string()),
        }
    }

    pub fn service_type(&self) -> ServiceType {
        ServiceType::from_config_str(self.kind.as_deref().unwrap_or("custom"))
    }
}

impl PulseConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Built-in service list used when no config file is present.
    ///
    /// URLs can be overridden through `lookup` (normally the process
    /// environment): `SERVICE_1_URL`, `SERVICE_2_URL`, `VERCEL_SERVICE_1_URL`.
    pub fn builtin_services(lookup: impl Fn(&str) -> Option<String>) -> Vec<ServiceConfig> {
        let url = |var: &str, fallback: &str| lookup(var).unwrap_or_else(|| fallback.to_string());
        vec![
            ServiceConfig::new(
                "Render Service 1",
                &url("SERVICE_1_URL", "https://service1.example.com/health"),
                "render",
            ),
            ServiceConfig::new(
                "Render Service 2",
                &url("SERVICE_2_URL", "https://service2.example.com/health"),
                "render",
            ),
            ServiceConfig::new(
                "Vercel Service 1",
                &url(
                    "VERCEL_SERVICE_1_URL",
                    "https://vercel-service1.example.com/health",
                ),
                "vercel",
            ),
        ]
    }

    /// Check the settings the daemon cannot start without.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.discord.token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        if self.discord.monitor_channel_id == 0 {
            return Err(ConfigError::MissingMonitorChannel);
        }
        self.validate_services()
    }

    /// Service-list checks only; used by the one-shot `check` command,
    /// which never talks to the chat platform.
    pub fn validate_services(&self) -> ConfigResult<()> {
        if self.services.is_empty() {
            return Err(ConfigError::NoServices);
        }
        let mut seen = HashSet::new();
        for svc in &self.services {
            if !seen.insert(svc.name.as_str()) {
                return Err(ConfigError::DuplicateService(svc.name.clone()));
            }
        }
        Ok(())
    }
}

fn default_update_interval() -> u64 {
    DEFAULT_UPDATE_INTERVAL_MINUTES
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_command_prefix() -> String {
    DEFAULT_COMMAND_PREFIX.to_string()
}
