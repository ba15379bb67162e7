//! Discord transport: REST for channels and messages, websocket gateway for
//! readiness and incoming commands.

pub mod gateway;
pub mod rest;

pub use gateway::DiscordGateway;
pub use rest::DiscordClient;

pub(crate) const API_BASE: &str = "https://discord.com/api/v10";
pub(crate) const GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";
