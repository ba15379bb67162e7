//! Discord gateway session.
//!
//! Handles the Hello → Identify handshake, heartbeats, and translates
//! dispatches into [`GatewayEvent`]s on an mpsc channel. The first `READY`
//! is the readiness gate the daemon waits on before it starts monitoring.
//!
//! A failure before the first `READY` is returned to the caller (startup
//! is fatal). After that, dropped sessions are re-established.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::{NotifyError, NotifyResult};
use crate::sink::{ChannelId, GatewayEvent, IncomingMessage};

use super::GATEWAY_URL;

const OP_DISPATCH: u8 = 0;
const OP_HEARTBEAT: u8 = 1;
const OP_IDENTIFY: u8 = 2;
const OP_RECONNECT: u8 = 7;
const OP_INVALID_SESSION: u8 = 9;
const OP_HELLO: u8 = 10;
const OP_HEARTBEAT_ACK: u8 = 11;

const INTENT_GUILDS: u64 = 1 << 0;
const INTENT_GUILD_MESSAGES: u64 = 1 << 9;
const INTENT_DIRECT_MESSAGES: u64 = 1 << 12;
const INTENT_MESSAGE_CONTENT: u64 = 1 << 15;

/// Intents needed to see command messages and their text.
pub const DEFAULT_INTENTS: u64 =
    INTENT_GUILDS | INTENT_GUILD_MESSAGES | INTENT_DIRECT_MESSAGES | INTENT_MESSAGE_CONTENT;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Close codes after which reconnecting cannot succeed.
const FATAL_CLOSE_CODES: &[u16] = &[4004, 4010, 4011, 4012, 4013, 4014];

#[derive(Debug, Deserialize)]
struct Payload {
    op: u8,
    #[serde(default)]
    d: Value,
    s: Option<u64>,
    t: Option<String>,
}

/// How a session ended.
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    Shutdown,
    /// The gateway asked us to reconnect or the socket closed.
    Reconnect,
}

pub struct DiscordGateway {
    token: String,
    url: String,
    intents: u64,
}

impl DiscordGateway {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            url: GATEWAY_URL.to_string(),
            intents: DEFAULT_INTENTS,
        }
    }

    /// Connect to a different gateway URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Run sessions until shutdown.
    ///
    /// Returns an error only if no session ever became ready, or the
    /// gateway rejected the bot's credentials.
    pub async fn run(
        self,
        events: mpsc::Sender<GatewayEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> NotifyResult<()> {
        let mut ready = false;
        loop {
            match self.session(&events, &mut shutdown, &mut ready).await {
                Ok(SessionEnd::Shutdown) => {
                    info!("gateway shutting down");
                    return Ok(());
                }
                Ok(SessionEnd::Reconnect) if ready => {
                    info!("gateway session ended, reconnecting");
                }
                Ok(SessionEnd::Reconnect) => {
                    return Err(NotifyError::Gateway(
                        "connection closed before ready".to_string(),
                    ));
                }
                Err(e) if ready && !is_fatal(&e) => {
                    warn!(error = %e, "gateway session failed, reconnecting");
                }
                Err(e) => return Err(e),
            }

            tokio::select! {
                _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                _ = shutdown.changed() => return Ok(()),
            }
        }
    }

    async fn session(
        &self,
        events: &mpsc::Sender<GatewayEvent>,
        shutdown: &mut watch::Receiver<bool>,
        ready: &mut bool,
    ) -> NotifyResult<SessionEnd> {
        let (ws, _) = connect_async(self.url.as_str()).await?;
        let (mut write, mut read) = ws.split();
        debug!(url = %self.url, "gateway connected");

        let hello = loop {
            match read.next().await {
                Some(Ok(Message::Text(text))) => break parse_payload(&text)?,
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(SessionEnd::Reconnect),
            }
        };
        let interval = heartbeat_interval(&hello)?;
        debug!(interval_ms = interval.as_millis() as u64, "gateway hello");

        write
            .send(Message::Text(identify_payload(&self.token, self.intents).to_string()))
            .await?;

        let mut sequence: Option<u64> = None;
        let mut heartbeat = tokio::time::interval(interval);
        // The first tick completes immediately; skip it.
        heartbeat.tick().await;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    write.send(Message::Text(heartbeat_payload(sequence).to_string())).await?;
                }
                msg = read.next() => {
                    let text = match msg {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(frame))) => {
                            if let Some(frame) = &frame {
                                let code = u16::from(frame.code);
                                if FATAL_CLOSE_CODES.contains(&code) {
                                    return Err(NotifyError::GatewayClosed {
                                        code,
                                        reason: frame.reason.to_string(),
                                    });
                                }
                            }
                            return Ok(SessionEnd::Reconnect);
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => return Err(e.into()),
                        None => return Ok(SessionEnd::Reconnect),
                    };

                    let payload = parse_payload(&text)?;
                    if payload.s.is_some() {
                        sequence = payload.s;
                    }
                    match payload.op {
                        OP_DISPATCH => {
                            let Some(event) = decode_dispatch(payload.t.as_deref(), &payload.d) else {
                                continue;
                            };
                            if let GatewayEvent::Ready { user } = &event {
                                info!(%user, "gateway ready");
                                *ready = true;
                            }
                            if events.send(event).await.is_err() {
                                // Nobody is listening any more.
                                return Ok(SessionEnd::Shutdown);
                            }
                        }
                        OP_HEARTBEAT => {
                            write.send(Message::Text(heartbeat_payload(sequence).to_string())).await?;
                        }
                        OP_HEARTBEAT_ACK => {}
                        OP_RECONNECT => return Ok(SessionEnd::Reconnect),
                        OP_INVALID_SESSION => {
                            return Err(NotifyError::Gateway("invalid session".to_string()));
                        }
                        op => debug!(op, "ignoring gateway opcode"),
                    }
                }
                _ = shutdown.changed() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(SessionEnd::Shutdown);
                }
            }
        }
    }
}

fn is_fatal(e: &NotifyError) -> bool {
    matches!(e, NotifyError::GatewayClosed { .. })
}

fn parse_payload(text: &str) -> NotifyResult<Payload> {
    Ok(serde_json::from_str(text)?)
}

fn heartbeat_interval(hello: &Payload) -> NotifyResult<Duration> {
    if hello.op != OP_HELLO {
        return Err(NotifyError::Gateway(format!(
            "expected hello, got opcode {}",
            hello.op
        )));
    }
    match hello.d["heartbeat_interval"].as_u64() {
        Some(0) => Err(NotifyError::Gateway("hello with zero heartbeat_interval".to_string())),
        Some(ms) => Ok(Duration::from_millis(ms)),
        None => Err(NotifyError::Gateway("hello without heartbeat_interval".to_string())),
    }
}

fn identify_payload(token: &str, intents: u64) -> Value {
    json!({
        "op": OP_IDENTIFY,
        "d": {
            "token": token,
            "intents": intents,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "pulsewatch",
                "device": "pulsewatch",
            },
        },
    })
}

fn heartbeat_payload(sequence: Option<u64>) -> Value {
    json!({ "op": OP_HEARTBEAT, "d": sequence })
}

/// Translate a dispatch into an event, ignoring the ones we do not use.
fn decode_dispatch(kind: Option<&str>, d: &Value) -> Option<GatewayEvent> {
    match kind? {
        "READY" => Some(GatewayEvent::Ready {
            user: d["user"]["username"].as_str().unwrap_or_default().to_string(),
        }),
        "MESSAGE_CREATE" => {
            let channel_id = d["channel_id"].as_str()?.parse().ok()?;
            Some(GatewayEvent::Message(IncomingMessage {
                channel_id: ChannelId(channel_id),
                author: d["author"]["username"].as_str().unwrap_or_default().to_string(),
                author_is_bot: d["author"]["bot"].as_bool().unwrap_or(false),
                content: d["content"].as_str().unwrap_or_default().to_string(),
            }))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rejected_credentials_are_fatal() {
        assert!(is_fatal(&NotifyError::GatewayClosed {
            code: 4004,
            reason: "Authentication failed.".to_string(),
        }));
        assert!(!is_fatal(&NotifyError::Gateway("invalid session".to_string())));
    }

    #[test]
    fn identify_carries_token_and_intents() {
        let payload = identify_payload("secret", DEFAULT_INTENTS);
        assert_eq!(payload["op"], 2);
        assert_eq!(payload["d"]["token"], "secret");
        assert_eq!(payload["d"]["intents"], 37377);
    }

    #[test]
    fn heartbeat_carries_sequence() {
        assert_eq!(heartbeat_payload(None), json!({ "op": 1, "d": null }));
        assert_eq!(heartbeat_payload(Some(42)), json!({ "op": 1, "d": 42 }));
    }

    #[test]
    fn hello_interval() {
        let hello = parse_payload(r#"{"op":10,"d":{"heartbeat_interval":41250},"s":null,"t":null}"#)
            .unwrap();
        assert_eq!(heartbeat_interval(&hello).unwrap(), Duration::from_millis(41250));
    }

    #[test]
    fn zero_heartbeat_interval_rejected() {
        let hello = parse_payload(r#"{"op":10,"d":{"heartbeat_interval":0}}"#).unwrap();
        assert!(matches!(heartbeat_interval(&hello), Err(NotifyError::Gateway(_))));
    }

    #[test]
    fn non_hello_rejected() {
        let payload = parse_payload(r#"{"op":11}"#).unwrap();
        assert!(heartbeat_interval(&payload).is_err());
    }

    #[test]
    fn decode_ready() {
        let d = json!({ "user": { "username": "pulsewatch", "id": "1" } });
        assert_eq!(
            decode_dispatch(Some("READY"), &d),
            Some(GatewayEvent::Ready {
                user: "pulsewatch".to_string()
            })
        );
    }

    #[test]
    fn decode_message_create() {
        let d = json!({
            "channel_id": "123456789",
            "content": "!status",
            "author": { "username": "ops", "bot": false },
        });
        assert_eq!(
            decode_dispatch(Some("MESSAGE_CREATE"), &d),
            Some(GatewayEvent::Message(IncomingMessage {
                channel_id: ChannelId(123456789),
                author: "ops".to_string(),
                author_is_bot: false,
                content: "!status".to_string(),
            }))
        );
    }

    #[test]
    fn decode_bot_author() {
        let d = json!({
            "channel_id": "1",
            "content": "!status",
            "author": { "username": "other-bot", "bot": true },
        });
        let Some(GatewayEvent::Message(msg)) = decode_dispatch(Some("MESSAGE_CREATE"), &d) else {
            panic!("expected message");
        };
        assert!(msg.author_is_bot);
    }

    #[test]
    fn decode_ignores_other_dispatches() {
        assert_eq!(decode_dispatch(Some("GUILD_CREATE"), &json!({})), None);
        assert_eq!(decode_dispatch(None, &json!({})), None);
        assert_eq!(
            decode_dispatch(Some("MESSAGE_CREATE"), &json!({ "channel_id": "nope" })),
            None
        );
    }
}
