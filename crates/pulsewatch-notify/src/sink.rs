//! Chat platform capability and the message types that cross it.

use std::fmt;

use async_trait::async_trait;

use crate::error::NotifyResult;

/// Platform-level channel identifier (a Discord snowflake).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A channel that has been resolved against the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: ChannelId,
    pub name: Option<String>,
}

/// The two operations the reporter needs from a chat platform.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Look up a channel by id. Fails if it does not exist or is not
    /// visible to the bot.
    async fn resolve_channel(&self, id: ChannelId) -> NotifyResult<Channel>;

    /// Post a text message to a channel.
    async fn send(&self, channel: ChannelId, text: &str) -> NotifyResult<()>;
}

/// A chat message received from the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub channel_id: ChannelId,
    pub author: String,
    pub author_is_bot: bool,
    pub content: String,
}

/// Events surfaced by a gateway connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// Session established; the bot can now be addressed.
    Ready { user: String },
    /// A message was posted somewhere the bot can see.
    Message(IncomingMessage),
}
