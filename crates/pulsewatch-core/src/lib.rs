//! pulsewatch-core — shared types, configuration, and the service registry.
//!
//! The registry is the single source of truth for every monitored service.
//! It is built once from [`PulseConfig`] at startup and shared by `Arc`
//! between the prober, the reporter, and the command handler.

pub mod config;
pub mod error;
pub mod registry;
pub mod types;

pub use config::{DiscordConfig, MonitorConfig, PulseConfig, ServiceConfig};
pub use error::{ConfigError, ConfigResult};
pub use registry::ServiceRegistry;
pub use types::*;
