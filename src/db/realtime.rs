// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Realtime change feed over the backend's Phoenix-channel websocket.
//!
//! Each subscription owns its own socket and joins exactly one channel with a
//! `postgres_changes` config. The socket task keeps the connection alive with
//! heartbeats and forwards matching row changes until the subscription is
//! dropped or the server closes the connection.

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::db::changes::SUBSCRIPTION_BUFFER;
use crate::db::{ChangeEvent, ChangeKind, ChangeTopic, Subscription};
use crate::error::{AppError, Result};

const PROTOCOL_VERSION: &str = "1.0.0";
const SCHEMA: &str = "public";
const JOIN_REF: &str = "1";

/// Phoenix frame envelope.
#[derive(Debug, Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    payload: Value,
}

/// `postgres_changes` payload data.
#[derive(Debug, Deserialize)]
struct ChangeData {
    #[serde(rename = "type")]
    kind: String,
    table: String,
    #[serde(default)]
    record: Option<Value>,
    #[serde(default)]
    old_record: Option<Value>,
}

/// Websocket URL for a backend base URL.
pub fn websocket_url(base_url: &str, anon_key: &str) -> String {
    let ws_base = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base_url.to_string()
    };
    format!(
        "{}/realtime/v1/websocket?apikey={}&vsn={}",
        ws_base,
        urlencoding::encode(anon_key),
        PROTOCOL_VERSION
    )
}

/// Channel join frame for a topic.
pub fn join_frame(topic: &ChangeTopic, access_token: Option<&str>) -> Value {
    let mut change = json!({
        "event": "*",
        "schema": SCHEMA,
        "table": topic.table,
    });
    if let Some(filter) = &topic.filter {
        change["filter"] = Value::String(filter.realtime_expr());
    }

    let mut payload = json!({
        "config": {
            "broadcast": { "self": false },
            "presence": { "key": "" },
            "postgres_changes": [change],
        }
    });
    if let Some(token) = access_token {
        payload["access_token"] = Value::String(token.to_string());
    }

    json!({
        "topic": format!("realtime:{}", topic.channel_name()),
        "event": "phx_join",
        "payload": payload,
        "ref": JOIN_REF,
        "join_ref": JOIN_REF,
    })
}

fn heartbeat_frame(reference: u64) -> Value {
    json!({
        "topic": "phoenix",
        "event": "heartbeat",
        "payload": {},
        "ref": reference.to_string(),
    })
}

/// What the socket task should do with an incoming text frame.
#[derive(Debug, PartialEq)]
pub enum Incoming {
    Change(ChangeEvent),
    JoinRejected(String),
    Ignore,
}

/// Interpret one text frame.
pub fn parse_frame(text: &str) -> Incoming {
    let Ok(frame) = serde_json::from_str::<Frame>(text) else {
        return Incoming::Ignore;
    };

    match frame.event.as_str() {
        "postgres_changes" => {
            let Some(data) = frame.payload.get("data").cloned() else {
                return Incoming::Ignore;
            };
            let Ok(data) = serde_json::from_value::<ChangeData>(data) else {
                return Incoming::Ignore;
            };
            match ChangeKind::from_wire(&data.kind) {
                Some(kind) => Incoming::Change(ChangeEvent {
                    table: data.table,
                    kind,
                    record: data.record.filter(|r| !r.is_null()),
                    old_record: data.old_record.filter(|r| !r.is_null()),
                }),
                None => Incoming::Ignore,
            }
        }
        "phx_reply" if frame.payload.get("status").and_then(Value::as_str) == Some("error") => {
            Incoming::JoinRejected(frame.payload["response"].to_string())
        }
        _ => Incoming::Ignore,
    }
}

/// Whether the socket task passes an event on to its subscriber.
///
/// The server has already applied the topic's row filter, and delete events
/// may carry only the primary key in `old_record`, so only the table is
/// checked here.
pub fn forwards(topic: &ChangeTopic, event: &ChangeEvent) -> bool {
    event.table == topic.table
}

/// Connect, join the topic's channel and start forwarding changes.
pub async fn subscribe(
    url: &str,
    access_token: Option<String>,
    topic: ChangeTopic,
    heartbeat: Duration,
) -> Result<Subscription> {
    let (socket, _) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| AppError::Realtime(format!("Failed to connect: {}", e)))?;
    let (mut sink, mut stream) = socket.split();

    let join = join_frame(&topic, access_token.as_deref());
    sink.send(Message::Text(join.to_string()))
        .await
        .map_err(|e| AppError::Realtime(format!("Failed to join channel: {}", e)))?;

    let (tx, events) = mpsc::channel(SUBSCRIPTION_BUFFER);
    let scope = topic.clone();

    let feeder = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(heartbeat);
        ticker.tick().await; // first tick is immediate
        let mut next_ref: u64 = 2;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let frame = heartbeat_frame(next_ref);
                    next_ref += 1;
                    if let Err(e) = sink.send(Message::Text(frame.to_string())).await {
                        tracing::warn!(error = %e, channel = %scope.channel_name(), "Heartbeat failed");
                        break;
                    }
                }
                message = stream.next() => {
                    let text = match message {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::info!(channel = %scope.channel_name(), "Realtime socket closed");
                            break;
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, channel = %scope.channel_name(), "Realtime socket error");
                            break;
                        }
                    };

                    match parse_frame(&text) {
                        Incoming::Change(event) if forwards(&scope, &event) => {
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Incoming::JoinRejected(reason) => {
                            tracing::error!(channel = %scope.channel_name(), reason = %reason, "Channel join rejected");
                            break;
                        }
                        _ => {}
                    }
                }
            }
        }
    });

    tracing::debug!(channel = %topic.channel_name(), "Subscribed to realtime channel");
    Ok(Subscription::new(topic, events, feeder))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Filter;

    #[test]
    fn test_websocket_url_from_https_base() {
        assert_eq!(
            websocket_url("https://proj.example.co", "key"),
            "wss://proj.example.co/realtime/v1/websocket?apikey=key&vsn=1.0.0"
        );
        assert!(websocket_url("http://localhost:54321", "k").starts_with("ws://localhost:54321/"));
    }

    #[test]
    fn test_join_frame_carries_filter_and_token() {
        let topic = ChangeTopic::filtered("videos", Filter::eq("user_id", "u1"));
        let frame = join_frame(&topic, Some("jwt"));

        assert_eq!(frame["event"], "phx_join");
        assert_eq!(frame["topic"], "realtime:videos:user_id=eq.u1");
        let change = &frame["payload"]["config"]["postgres_changes"][0];
        assert_eq!(change["table"], "videos");
        assert_eq!(change["filter"], "user_id=eq.u1");
        assert_eq!(frame["payload"]["access_token"], "jwt");
    }

    #[test]
    fn test_join_frame_without_filter_omits_it() {
        let frame = join_frame(&ChangeTopic::table("likes"), None);
        let change = &frame["payload"]["config"]["postgres_changes"][0];
        assert!(change.get("filter").is_none());
        assert!(frame["payload"].get("access_token").is_none());
    }

    #[test]
    fn test_parse_postgres_change() {
        let text = r#"{
            "topic": "realtime:likes",
            "event": "postgres_changes",
            "payload": { "data": {
                "type": "DELETE",
                "table": "likes",
                "record": null,
                "old_record": { "id": "l1" }
            }, "ids": [1] },
            "ref": null
        }"#;

        match parse_frame(text) {
            Incoming::Change(event) => {
                assert_eq!(event.kind, ChangeKind::Delete);
                assert_eq!(event.table, "likes");
                assert!(event.record.is_none());
                assert_eq!(event.old_record, Some(json!({ "id": "l1" })));
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_delete_with_key_only_old_record_is_forwarded() {
        let topic = ChangeTopic::filtered("videos", Filter::eq("user_id", "u1"));
        let text = r#"{
            "topic": "realtime:videos:user_id=eq.u1",
            "event": "postgres_changes",
            "payload": { "data": {
                "type": "DELETE",
                "table": "videos",
                "record": null,
                "old_record": { "id": "v1" }
            }, "ids": [7] },
            "ref": null
        }"#;

        let Incoming::Change(event) = parse_frame(text) else {
            panic!("expected a change");
        };
        assert!(forwards(&topic, &event));

        let other_table = ChangeEvent {
            table: "likes".to_string(),
            ..event
        };
        assert!(!forwards(&topic, &other_table));
    }

    #[test]
    fn test_parse_join_error_and_noise() {
        let rejected = r#"{"event":"phx_reply","payload":{"status":"error","response":{"reason":"denied"}}}"#;
        assert!(matches!(parse_frame(rejected), Incoming::JoinRejected(_)));

        let ok = r#"{"event":"phx_reply","payload":{"status":"ok","response":{}}}"#;
        assert_eq!(parse_frame(ok), Incoming::Ignore);
        assert_eq!(parse_frame("not json"), Incoming::Ignore);
    }
}
