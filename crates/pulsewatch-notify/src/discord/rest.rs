//! Discord REST client implementing [`ChatClient`].

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{NotifyError, NotifyResult};
use crate::sink::{Channel, ChannelId, ChatClient};

use super::API_BASE;

/// Discord rejects message bodies longer than this.
const MAX_MESSAGE_CHARS: usize = 2000;

pub struct DiscordClient {
    http: Client,
    token: String,
    base_url: String,
}

#[derive(Deserialize)]
struct ChannelPayload {
    id: String,
    name: Option<String>,
}

#[derive(Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
}

impl DiscordClient {
    pub fn new(token: impl Into<String>) -> NotifyResult<Self> {
        Self::with_base_url(token, API_BASE)
    }

    /// Point the client at a different API root (used by tests).
    pub fn with_base_url(token: impl Into<String>, base_url: &str) -> NotifyResult<Self> {
        let http = Client::builder()
            .user_agent(concat!(
                "DiscordBot (https://github.com/pulsewatch/pulsewatch, ",
                env!("CARGO_PKG_VERSION"),
                ")"
            ))
            .build()?;
        Ok(Self {
            http,
            token: token.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }
}

#[async_trait]
impl ChatClient for DiscordClient {
    async fn resolve_channel(&self, id: ChannelId) -> NotifyResult<Channel> {
        let resp = self
            .http
            .get(format!("{}/channels/{}", self.base_url, id))
            .header("authorization", self.auth())
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(NotifyError::ChannelNotFound(id.0));
        }
        let payload: ChannelPayload = check_status(resp).await?.json().await?;
        debug!(channel = %payload.id, name = ?payload.name, "channel resolved");
        Ok(Channel {
            id,
            name: payload.name,
        })
    }

    async fn send(&self, channel: ChannelId, text: &str) -> NotifyResult<()> {
        let content = truncate_message(text);
        let resp = self
            .http
            .post(format!("{}/channels/{}/messages", self.base_url, channel))
            .header("authorization", self.auth())
            .json(&CreateMessage { content: &content })
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }
}

async fn check_status(resp: reqwest::Response) -> NotifyResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(NotifyError::Api {
        status: status.as_u16(),
        body,
    })
}

/// Trim a message to Discord's length limit, ending with an ellipsis when
/// cut. A cut inside a fenced block closes the fence.
fn truncate_message(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text.to_string();
    }
    let closed = "…\n```";
    let keep = MAX_MESSAGE_CHARS - closed.chars().count();
    let mut out: String = text.chars().take(keep).collect();
    if out.matches("```").count() % 2 == 1 {
        out.push_str(closed);
    } else {
        // Room for the shorter suffix.
        out.extend(text.chars().skip(keep).take(closed.chars().count() - 1));
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};

    #[derive(Clone, Default)]
    struct Api {
        posted: Arc<Mutex<Vec<(String, String, String)>>>,
    }

    async fn get_channel(Path(id): Path<String>) -> Result<Json<Value>, AxumStatus> {
        if id == "404" {
            return Err(AxumStatus::NOT_FOUND);
        }
        Ok(Json(json!({ "id": id, "name": "monitoring", "type": 0 })))
    }

    async fn post_message(
        State(api): State<Api>,
        Path(id): Path<String>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Result<Json<Value>, AxumStatus> {
        if id == "403" {
            return Err(AxumStatus::FORBIDDEN);
        }
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let content = body["content"].as_str().unwrap_or_default().to_string();
        api.posted.lock().unwrap().push((id, auth, content));
        Ok(Json(json!({ "id": "1" })))
    }

    async fn serve() -> (String, Api) {
        let api = Api::default();
        let router = Router::new()
            .route("/channels/{id}", get(get_channel))
            .route("/channels/{id}/messages", post(post_message))
            .with_state(api.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (format!("http://{addr}"), api)
    }

    #[tokio::test]
    async fn resolve_existing_channel() {
        let (base, _) = serve().await;
        let client = DiscordClient::with_base_url("tok", &base).unwrap();
        let channel = client.resolve_channel(ChannelId(42)).await.unwrap();
        assert_eq!(channel.id, ChannelId(42));
        assert_eq!(channel.name.as_deref(), Some("monitoring"));
    }

    #[tokio::test]
    async fn resolve_missing_channel() {
        let (base, _) = serve().await;
        let client = DiscordClient::with_base_url("tok", &base).unwrap();
        assert!(matches!(
            client.resolve_channel(ChannelId(404)).await,
            Err(NotifyError::ChannelNotFound(404))
        ));
    }

    #[tokio::test]
    async fn send_posts_content_with_bot_auth() {
        let (base, api) = serve().await;
        let client = DiscordClient::with_base_url("tok", &base).unwrap();
        client.send(ChannelId(7), "hello").await.unwrap();

        let posted = api.posted.lock().unwrap().clone();
        assert_eq!(posted, [("7".to_string(), "Bot tok".to_string(), "hello".to_string())]);
    }

    #[tokio::test]
    async fn send_rejected_maps_to_api_error() {
        let (base, _) = serve().await;
        let client = DiscordClient::with_base_url("tok", &base).unwrap();
        assert!(matches!(
            client.send(ChannelId(403), "hello").await,
            Err(NotifyError::Api { status: 403, .. })
        ));
    }

    #[test]
    fn short_messages_untouched() {
        assert_eq!(truncate_message("hi"), "hi");
    }

    #[test]
    fn long_messages_truncated_to_limit() {
        let long = "x".repeat(5000);
        let out = truncate_message(&long);
        assert_eq!(out.chars().count(), MAX_MESSAGE_CHARS);
        assert!(out.ends_with('…'));

        let fenced = format!("```\n{}```", "y".repeat(5000));
        let out = truncate_message(&fenced);
        assert_eq!(out.chars().count(), MAX_MESSAGE_CHARS);
        assert!(out.ends_with("…\n```"));
    }

    #[test]
    fn closed_fence_before_cut_is_not_reopened() {
        let text = format!("```\nstatus\n```\n{}", "z".repeat(5000));
        let out = truncate_message(&text);
        assert_eq!(out.chars().count(), MAX_MESSAGE_CHARS);
        assert_eq!(out.matches("```").count(), 2);
        assert!(out.ends_with("z…"));
    }
}
