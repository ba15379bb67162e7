//! Chat command dispatch.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use pulsewatch_health::HealthProber;
use pulsewatch_notify::{GatewayEvent, IncomingMessage, StatusReporter, render_summary};

const CHECKING_REPLY: &str = "Checking service status...";

/// Commands the bot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run a check now and reply with the summary.
    Status,
}

impl Command {
    /// Parse `content` as `<prefix><name>`. Anything after the command
    /// name is ignored.
    pub fn parse(prefix: &str, content: &str) -> Option<Self> {
        let rest = content.trim().strip_prefix(prefix)?;
        let name = rest.split_whitespace().next()?;
        match name.to_ascii_lowercase().as_str() {
            "status" => Some(Command::Status),
            _ => None,
        }
    }
}

/// Answers commands arriving from the chat gateway.
pub struct CommandHandler {
    prober: Arc<HealthProber>,
    reporter: Arc<StatusReporter>,
    prefix: String,
}

impl CommandHandler {
    pub fn new(
        prober: Arc<HealthProber>,
        reporter: Arc<StatusReporter>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            prober,
            reporter,
            prefix: prefix.into(),
        }
    }

    /// Handle one message. Returns the command that ran, if any.
    pub async fn handle(&self, msg: &IncomingMessage) -> Option<Command> {
        if msg.author_is_bot {
            return None;
        }
        let command = Command::parse(&self.prefix, &msg.content)?;
        info!(?command, author = %msg.author, channel = %msg.channel_id, "command received");

        match command {
            Command::Status => {
                self.reporter.reply(msg.channel_id, CHECKING_REPLY).await;
                self.prober.check_all().await;
                let services = self.prober.registry().get_all();
                self.reporter
                    .reply(msg.channel_id, &render_summary(&services))
                    .await;
            }
        }
        Some(command)
    }

    /// Consume gateway events until the channel closes or `shutdown` flips.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<GatewayEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(GatewayEvent::Message(msg)) => {
                        self.handle(&msg).await;
                    }
                    Some(GatewayEvent::Ready { user }) => {
                        debug!(%user, "gateway session resumed");
                    }
                    None => break,
                },
                _ = shutdown.changed() => break,
            }
        }
        debug!("command dispatch stopped");
    }
}
