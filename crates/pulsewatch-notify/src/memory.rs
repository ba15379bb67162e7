//! Chat clients that never leave the process.
//!
//! `MemoryClient` records every message and is what the test suites wire
//! into the reporter. `StdoutClient` backs the one-shot `check` command.

use std::collections::HashSet;
use std::io::Write;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::{NotifyError, NotifyResult};
use crate::sink::{Channel, ChannelId, ChatClient};

/// Records sends in memory.
#[derive(Default)]
pub struct MemoryClient {
    sent: Mutex<Vec<(ChannelId, String)>>,
    missing: HashSet<ChannelId>,
    fail_sends: bool,
    failures: Mutex<usize>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose every send fails with an API error.
    pub fn failing() -> Self {
        Self {
            fail_sends: true,
            ..Self::default()
        }
    }

    /// Make `resolve_channel` fail for `id`.
    pub fn with_missing(mut self, id: ChannelId) -> Self {
        self.missing.insert(id);
        self
    }

    /// Every successful send, in order.
    pub fn sent(&self) -> Vec<(ChannelId, String)> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Successful sends to one channel, in order.
    pub fn sent_to(&self, channel: ChannelId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(id, _)| *id == channel)
            .map(|(_, text)| text)
            .collect()
    }

    pub fn failures(&self) -> usize {
        *self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ChatClient for MemoryClient {
    async fn resolve_channel(&self, id: ChannelId) -> NotifyResult<Channel> {
        if self.missing.contains(&id) {
            return Err(NotifyError::ChannelNotFound(id.0));
        }
        Ok(Channel {
            id,
            name: Some(format!("channel-{id}")),
        })
    }

    async fn send(&self, channel: ChannelId, text: &str) -> NotifyResult<()> {
        if self.fail_sends {
            *self.failures.lock().unwrap_or_else(PoisonError::into_inner) += 1;
            return Err(NotifyError::Api {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((channel, text.to_string()));
        Ok(())
    }
}

/// Prints every message to stdout.
#[derive(Debug, Default)]
pub struct StdoutClient;

#[async_trait]
impl ChatClient for StdoutClient {
    async fn resolve_channel(&self, id: ChannelId) -> NotifyResult<Channel> {
        Ok(Channel {
            id,
            name: Some("stdout".to_string()),
        })
    }

    async fn send(&self, _channel: ChannelId, text: &str) -> NotifyResult<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{text}")?;
        Ok(())
    }
}
