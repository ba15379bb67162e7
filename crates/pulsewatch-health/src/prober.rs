//! HealthProber — concurrent fan-out over every registered service.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use pulsewatch_core::{ServiceRegistry, ServiceStatus};

use crate::checker::{build_client, http_probe};

const CHECK_PASSED: &str = "Health check passed";
const CHECK_FAILED: &str = "Health check failed";

/// Result of probing one service during `check_all`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub name: String,
    pub status: ServiceStatus,
    /// Status before this check was written back.
    pub previous: ServiceStatus,
}

impl ProbeOutcome {
    pub fn changed(&self) -> bool {
        self.status != self.previous
    }
}

/// Probes services in the registry and records the results.
pub struct HealthProber {
    registry: Arc<ServiceRegistry>,
    client: reqwest::Client,
    timeout: Duration,
}

impl HealthProber {
    /// Create a prober with its own HTTP client.
    pub fn new(registry: Arc<ServiceRegistry>, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self::with_client(registry, build_client()?, timeout))
    }

    /// Create a prober that shares an existing HTTP client.
    pub fn with_client(
        registry: Arc<ServiceRegistry>,
        client: reqwest::Client,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            client,
            timeout,
        }
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Probe one service by name without recording the result.
    ///
    /// Returns `None` if the name is not registered.
    pub async fn check_one(&self, name: &str) -> Option<ServiceStatus> {
        let service = self.registry.get(name)?;
        Some(http_probe(&self.client, &service.url, self.timeout).await)
    }

    /// Probe every service concurrently, then write all results back.
    ///
    /// Every probe is dispatched before any result is consumed, so the
    /// call takes as long as the slowest probe. Outcomes come back in
    /// registry order.
    pub async fn check_all(&self) -> Vec<ProbeOutcome> {
        let names = self.registry.names();
        debug!(services = names.len(), "checking all services");

        let results = join_all(names.iter().map(|name| self.check_one(name))).await;

        let mut outcomes = Vec::with_capacity(names.len());
        for (name, status) in names.into_iter().zip(results) {
            // A service can only disappear between snapshot and probe if the
            // registry was rebuilt underneath us; skip it in that case.
            let Some(status) = status else { continue };

            let message = if status.is_online() {
                CHECK_PASSED
            } else {
                CHECK_FAILED
            };
            let Some(previous) =
                self.registry
                    .update_status(&name, status, Some(message.to_string()))
            else {
                continue;
            };

            let outcome = ProbeOutcome {
                name,
                status,
                previous,
            };
            log_transition(&outcome);
            outcomes.push(outcome);
        }
        outcomes
    }
}

fn log_transition(outcome: &ProbeOutcome) {
    if !outcome.changed() {
        debug!(service = %outcome.name, status = %outcome.status, "status unchanged");
    } else if outcome.status.is_online() {
        info!(
            service = %outcome.name,
            from = %outcome.previous,
            to = %outcome.status,
            "service recovered"
        );
    } else {
        warn!(
            service = %outcome.name,
            from = %outcome.previous,
            to = %outcome.status,
            "service status changed"
        );
    }
}
