//! StatusReporter — publishes summaries and alerts through a [`ChatClient`].
//!
//! Send failures are logged and swallowed: nothing on the publish path can
//! interrupt the scheduling loop.

use std::sync::Arc;

use tracing::{debug, info, warn};

use pulsewatch_core::Service;

use crate::error::NotifyResult;
use crate::render::{render_alert, render_summary};
use crate::sink::{Channel, ChannelId, ChatClient};

pub struct StatusReporter {
    client: Arc<dyn ChatClient>,
    /// Receives the periodic full summary.
    monitor: Option<Channel>,
    /// Receives per-service alerts.
    alert: Option<Channel>,
}

impl StatusReporter {
    /// Create a reporter from already resolved channels.
    pub fn new(
        client: Arc<dyn ChatClient>,
        monitor: Option<Channel>,
        alert: Option<Channel>,
    ) -> Self {
        Self {
            client,
            monitor,
            alert,
        }
    }

    /// Resolve the configured channels and build a reporter.
    ///
    /// Runs once at startup. A channel that cannot be resolved is an error;
    /// a channel that is not configured stays absent.
    pub async fn connect(
        client: Arc<dyn ChatClient>,
        monitor_id: Option<ChannelId>,
        alert_id: Option<ChannelId>,
    ) -> NotifyResult<Self> {
        let monitor = match monitor_id {
            Some(id) => Some(client.resolve_channel(id).await?),
            None => None,
        };
        let alert = match alert_id {
            Some(id) => Some(client.resolve_channel(id).await?),
            None => None,
        };
        info!(
            monitor = ?monitor.as_ref().map(|c| c.id.0),
            alert = ?alert.as_ref().map(|c| c.id.0),
            "notification channels resolved"
        );
        Ok(Self::new(client, monitor, alert))
    }

    /// Send the full summary to the monitor channel.
    pub async fn publish_summary(&self, services: &[Service]) {
        let Some(channel) = &self.monitor else {
            debug!("no monitor channel, summary skipped");
            return;
        };
        let text = render_summary(services);
        self.deliver(channel.id, &text, "summary").await;
    }

    /// Send an alert for `service` if it is unhealthy and an alert channel
    /// exists. Repeated calls re-alert; there is no suppression.
    pub async fn publish_alert(&self, service: &Service) {
        if service.status.is_online() {
            return;
        }
        let Some(channel) = &self.alert else {
            return;
        };
        let text = render_alert(service);
        self.deliver(channel.id, &text, "alert").await;
    }

    /// Alert every non-Online service, in order.
    pub async fn publish_alerts(&self, services: &[Service]) {
        for svc in services.iter().filter(|s| !s.status.is_online()) {
            self.publish_alert(svc).await;
        }
    }

    /// Send free-form text to an arbitrary channel (command replies).
    pub async fn reply(&self, channel: ChannelId, text: &str) {
        self.deliver(channel, text, "reply").await;
    }

    async fn deliver(&self, channel: ChannelId, text: &str, kind: &'static str) {
        match self.client.send(channel, text).await {
            Ok(()) => debug!(%channel, kind, "message sent"),
            Err(e) => warn!(%channel, kind, error = %e, "failed to send message"),
        }
    }
}
