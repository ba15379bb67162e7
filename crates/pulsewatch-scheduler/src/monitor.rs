//! Monitor — the background task that drives probing and reporting.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use pulsewatch_health::HealthProber;
use pulsewatch_notify::StatusReporter;

/// What one cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub checked: usize,
    pub unhealthy: usize,
    pub changed: usize,
}

pub struct Monitor {
    prober: Arc<HealthProber>,
    reporter: Arc<StatusReporter>,
    interval: Duration,
}

impl Monitor {
    pub fn new(
        prober: Arc<HealthProber>,
        reporter: Arc<StatusReporter>,
        interval: Duration,
    ) -> Self {
        Self {
            prober,
            reporter,
            interval,
        }
    }

    /// Probe everything, publish the summary, then alert on every
    /// non-Online service.
    pub async fn run_cycle(&self) -> CycleReport {
        let outcomes = self.prober.check_all().await;

        // All write-backs are done; read the registry once for reporting.
        let services = self.prober.registry().get_all();
        self.reporter.publish_summary(&services).await;
        self.reporter.publish_alerts(&services).await;

        let report = CycleReport {
            checked: outcomes.len(),
            unhealthy: services.iter().filter(|s| !s.status.is_online()).count(),
            changed: outcomes.iter().filter(|o| o.changed()).count(),
        };
        debug!(?report, "monitor cycle complete");
        report
    }

    /// Run cycles until `shutdown` flips. The first cycle starts at once.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            services = self.prober.registry().len(),
            "monitor started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = self.run_cycle() => {}
                _ = shutdown.changed() => break,
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!("monitor shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pulsewatch_core::{ServiceConfig, ServiceRegistry, ServiceStatus};
    use pulsewatch_notify::{ChannelId, MemoryClient};

    const MONITOR: ChannelId = ChannelId(1);
    const ALERT: ChannelId = ChannelId(2);

    async fn monitor(services: &[ServiceConfig], client: &Arc<MemoryClient>) -> Monitor {
        let registry = Arc::new(ServiceRegistry::from_config(services));
        let prober = HealthProber::new(registry, Duration::from_millis(500)).unwrap();
        let reporter = StatusReporter::connect(client.clone(), Some(MONITOR), Some(ALERT))
            .await
            .unwrap();
        Monitor::new(Arc::new(prober), Arc::new(reporter), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn cycle_reports_unreachable_services() {
        let client = Arc::new(MemoryClient::new());
        let monitor = monitor(
            &[
                ServiceConfig::new("a", "http://127.0.0.1:1/health", "render"),
                ServiceConfig::new("b", "http://127.0.0.1:1/other", "vercel"),
            ],
            &client,
        )
        .await;

        let report = monitor.run_cycle().await;
        assert_eq!(
            report,
            CycleReport {
                checked: 2,
                unhealthy: 2,
                // Services start Offline, so an unreachable one does not change.
                changed: 0,
            }
        );
        assert_eq!(client.sent_to(MONITOR).len(), 1);
        assert_eq!(client.sent_to(ALERT).len(), 2);

        let registry = monitor.prober.registry();
        assert!(registry.get_all().iter().all(|s| s.status == ServiceStatus::Offline));
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let client = Arc::new(MemoryClient::new());
        let monitor = Arc::new(monitor(&[], &client).await);
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn({
            let monitor = monitor.clone();
            async move { monitor.run(rx).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("monitor did not stop")
            .unwrap();

        assert_eq!(client.sent_to(MONITOR).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_repeats_every_interval() {
        let client = Arc::new(MemoryClient::new());
        let monitor = Arc::new(monitor(&[], &client).await);
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn({
            let monitor = monitor.clone();
            async move { monitor.run(rx).await }
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(client.sent_to(MONITOR).len(), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(client.sent_to(MONITOR).len(), 2);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(client.sent_to(MONITOR).len(), 3);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
