//! pulsewatch-notify — status summaries and alerts.
//!
//! The reporter talks to the chat platform only through the [`ChatClient`]
//! capability: resolve a channel once, then send text to it. Channels that
//! are not configured are `None` in the reporter and every publish to them
//! is a no-op.
//!
//! # Architecture
//!
//! ```text
//! StatusReporter
//!   ├── render::render_summary / render_alert
//!   └── Arc<dyn ChatClient>
//!       ├── DiscordClient   (REST: resolve + send)
//!       ├── StdoutClient    (one-shot `check` mode)
//!       └── MemoryClient    (records sends, for tests)
//!
//! DiscordGateway (websocket) ──► mpsc<GatewayEvent> ──► command dispatch
//! ```

pub mod discord;
pub mod error;
pub mod memory;
pub mod render;
pub mod reporter;
pub mod sink;

pub use discord::{DiscordClient, DiscordGateway};
pub use error::{NotifyError, NotifyResult};
pub use memory::{MemoryClient, StdoutClient};
pub use render::{render_alert, render_summary};
pub use reporter::StatusReporter;
pub use sink::{Channel, ChannelId, ChatClient, GatewayEvent, IncomingMessage};
