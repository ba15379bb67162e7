//! Notification error types.

use thiserror::Error;

/// Errors that can occur while talking to the chat platform.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat api returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("channel not found: {0}")]
    ChannelNotFound(u64),

    #[error("gateway protocol error: {0}")]
    Gateway(String),

    #[error("gateway closed the session with {code}: {reason}")]
    GatewayClosed { code: u16, reason: String },

    #[error("websocket error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for NotifyError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        NotifyError::WebSocket(Box::new(e))
    }
}

pub type NotifyResult<T> = Result<T, NotifyError>;
