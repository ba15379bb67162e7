//! Gateway session tests against a local websocket server.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{WebSocketStream, accept_async};

use pulsewatch_notify::{ChannelId, DiscordGateway, GatewayEvent, NotifyError};

const WAIT: Duration = Duration::from_secs(15);

type Socket = WebSocketStream<TcpStream>;

async fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

async fn accept(listener: &TcpListener) -> Socket {
    let (stream, _) = listener.accept().await.unwrap();
    accept_async(stream).await.unwrap()
}

async fn send(ws: &mut Socket, payload: Value) {
    ws.send(Message::Text(payload.to_string())).await.unwrap();
}

async fn next_json(ws: &mut Socket) -> Value {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).unwrap(),
            Some(Ok(_)) => continue,
            other => panic!("socket ended: {other:?}"),
        }
    }
}

fn hello(interval_ms: u64) -> Value {
    json!({ "op": 10, "d": { "heartbeat_interval": interval_ms }, "s": null, "t": null })
}

fn dispatch(kind: &str, seq: u64, d: Value) -> Value {
    json!({ "op": 0, "d": d, "s": seq, "t": kind })
}

/// Hello, then wait for identify.
async fn handshake(ws: &mut Socket, interval_ms: u64) {
    send(ws, hello(interval_ms)).await;
    let identify = next_json(ws).await;
    assert_eq!(identify["op"], 2);
    assert_eq!(identify["d"]["token"], "secret");
}

async fn drain(mut ws: Socket) {
    while let Some(Ok(_)) = ws.next().await {}
}

#[tokio::test]
async fn ready_and_messages_are_delivered() {
    let (listener, url) = listen().await;
    let (beat_tx, beat_rx) = oneshot::channel();
    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        handshake(&mut ws, 50).await;
        send(&mut ws, dispatch("READY", 1, json!({ "user": { "username": "bot" } }))).await;
        send(
            &mut ws,
            dispatch(
                "MESSAGE_CREATE",
                2,
                json!({
                    "channel_id": "42",
                    "content": "!status",
                    "author": { "username": "ops", "bot": false },
                }),
            ),
        )
        .await;
        // Heartbeats carry the last sequence number seen.
        loop {
            let payload = next_json(&mut ws).await;
            if payload["op"] == 1 && payload["d"] == 2 {
                break;
            }
        }
        let _ = beat_tx.send(());
        drain(ws).await;
    });

    let (events_tx, mut events) = mpsc::channel(8);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let gateway = tokio::spawn(
        DiscordGateway::new("secret")
            .with_url(url)
            .run(events_tx, shutdown_rx),
    );

    let ready = timeout(WAIT, events.recv()).await.unwrap();
    assert_eq!(
        ready,
        Some(GatewayEvent::Ready {
            user: "bot".to_string()
        })
    );
    let Some(GatewayEvent::Message(msg)) = timeout(WAIT, events.recv()).await.unwrap() else {
        panic!("expected a message event");
    };
    assert_eq!(msg.channel_id, ChannelId(42));
    assert_eq!(msg.author, "ops");
    assert!(!msg.author_is_bot);
    assert_eq!(msg.content, "!status");

    timeout(WAIT, beat_rx).await.unwrap().unwrap();

    shutdown_tx.send(true).unwrap();
    let result = timeout(WAIT, gateway).await.unwrap().unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn rejected_token_is_fatal() {
    let (listener, url) = listen().await;
    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        handshake(&mut ws, 45_000).await;
        ws.send(Message::Close(Some(CloseFrame {
            code: CloseCode::from(4004),
            reason: "Authentication failed.".into(),
        })))
        .await
        .unwrap();
        drain(ws).await;
    });

    let (events_tx, _events) = mpsc::channel(8);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let result = timeout(
        WAIT,
        DiscordGateway::new("secret")
            .with_url(url)
            .run(events_tx, shutdown_rx),
    )
    .await
    .unwrap();

    match result {
        Err(NotifyError::GatewayClosed { code, reason }) => {
            assert_eq!(code, 4004);
            assert_eq!(reason, "Authentication failed.");
        }
        other => panic!("expected GatewayClosed, got {other:?}"),
    }
}

#[tokio::test]
async fn close_before_ready_is_an_error() {
    let (listener, url) = listen().await;
    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        handshake(&mut ws, 45_000).await;
        ws.close(None).await.unwrap();
        drain(ws).await;
    });

    let (events_tx, mut events) = mpsc::channel(8);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let result = timeout(
        WAIT,
        DiscordGateway::new("secret")
            .with_url(url)
            .run(events_tx, shutdown_rx),
    )
    .await
    .unwrap();

    assert!(matches!(result, Err(NotifyError::Gateway(_))), "{result:?}");
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn drop_after_ready_reconnects() {
    let (listener, url) = listen().await;
    tokio::spawn(async move {
        let mut first = accept(&listener).await;
        handshake(&mut first, 45_000).await;
        send(&mut first, dispatch("READY", 1, json!({ "user": { "username": "bot" } }))).await;
        first.close(None).await.unwrap();
        drain(first).await;

        let mut second = accept(&listener).await;
        handshake(&mut second, 45_000).await;
        send(&mut second, dispatch("READY", 1, json!({ "user": { "username": "bot-again" } })))
            .await;
        drain(second).await;
    });

    let (events_tx, mut events) = mpsc::channel(8);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let gateway = tokio::spawn(
        DiscordGateway::new("secret")
            .with_url(url)
            .run(events_tx, shutdown_rx),
    );

    let first = timeout(WAIT, events.recv()).await.unwrap();
    assert_eq!(
        first,
        Some(GatewayEvent::Ready {
            user: "bot".to_string()
        })
    );
    let second = timeout(WAIT, events.recv()).await.unwrap();
    assert_eq!(
        second,
        Some(GatewayEvent::Ready {
            user: "bot-again".to_string()
        })
    );

    shutdown_tx.send(true).unwrap();
    let result = timeout(WAIT, gateway).await.unwrap().unwrap();
    assert!(result.is_ok());
}
