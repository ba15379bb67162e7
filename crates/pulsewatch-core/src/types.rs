//! Domain types shared across pulsewatch crates.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Hosting platform a monitored service runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    /// Long-running web service on a remote render host.
    RemoteRender,
    /// Serverless edge deployment.
    ServerlessEdge,
    /// Anything else.
    Custom,
}

impl ServiceType {
    /// Map a config `type` string onto a service type.
    ///
    /// Matching is case-insensitive; unknown strings fall back to `Custom`.
    pub fn from_config_str(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "render" => ServiceType::RemoteRender,
            "vercel" => ServiceType::ServerlessEdge,
            _ => ServiceType::Custom,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ServiceType::RemoteRender => "render",
            ServiceType::ServerlessEdge => "vercel",
            ServiceType::Custom => "custom",
        }
    }
}

/// Health status of a monitored service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceStatus {
    /// Endpoint answered with HTTP 200.
    Online,
    /// Endpoint could not be reached (connection error, DNS, timeout).
    Offline,
    /// Endpoint answered with a non-200 status code.
    Degraded,
}

impl ServiceStatus {
    /// Chat glyph for this status. The exact characters are part of the
    /// message format consumers rely on.
    pub fn glyph(&self) -> &'static str {
        match self {
            ServiceStatus::Online => "✅",
            ServiceStatus::Offline => "❌",
            ServiceStatus::Degraded => "⚠️",
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, ServiceStatus::Online)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceStatus::Online => "online",
            ServiceStatus::Offline => "offline",
            ServiceStatus::Degraded => "degraded",
        };
        f.write_str(s)
    }
}

/// A monitored remote HTTP endpoint and its last known health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Unique name, the registry key.
    pub name: String,
    pub url: String,
    pub service_type: ServiceType,
    pub status: ServiceStatus,
    /// Diagnostic text from the most recent check.
    pub last_error: Option<String>,
    /// Unix timestamp (seconds) of the most recent check.
    pub last_checked: Option<u64>,
}

impl Service {
    /// A service that has not been checked yet. New services start `Offline`.
    pub fn new(name: impl Into<String>, url: impl Into<String>, service_type: ServiceType) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            service_type,
            status: ServiceStatus::Offline,
            last_error: None,
            last_checked: None,
        }
    }

    /// Replace status and diagnostic text, stamping the check time.
    pub fn update_status(&mut self, status: ServiceStatus, error_message: Option<String>) {
        self.status = status;
        self.last_error = error_message;
        self.last_checked = Some(epoch_secs());
    }
}

pub(crate) fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
