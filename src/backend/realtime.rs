//! Realtime Change Feed Client
//!
//! Joins the platform's realtime websocket (Phoenix channel protocol) and
//! forwards `postgres_changes` INSERT and DELETE events for one table into a
//! [`Subscription`]. A heartbeat keeps the socket open; releasing the
//! subscription sends `phx_leave` and closes the socket.

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::error::{BackendError, BackendResult};
use super::rest::RestConfig;
use super::subscription::Subscription;
use super::types::ChangeEvent;

const PROTOCOL_VERSION: &str = "1.0.0";
const DATABASE_SCHEMA: &str = "public";
const EVENT_QUEUE: usize = 64;

/// Phoenix channel frame (object serialization, protocol 1.0.0)
#[derive(Debug, Serialize, Deserialize)]
struct Frame {
    topic: String,
    event: String,
    #[serde(default)]
    payload: Value,
    #[serde(default, rename = "ref")]
    reference: Option<String>,
}

impl Frame {
    fn new(topic: &str, event: &str, payload: Value, reference: u64) -> Self {
        Self {
            topic: topic.to_string(),
            event: event.to_string(),
            payload,
            reference: Some(reference.to_string()),
        }
    }

    fn join(topic: &str, table: &str, api_key: &str, reference: u64) -> Self {
        let changes: Vec<Value> = ["INSERT", "DELETE"]
            .iter()
            .map(|event| json!({"event": event, "schema": DATABASE_SCHEMA, "table": table}))
            .collect();

        let payload = json!({
            "config": {
                "broadcast": {"self": false},
                "presence": {"key": ""},
                "postgres_changes": changes,
            },
            "access_token": api_key,
        });

        Self::new(topic, "phx_join", payload, reference)
    }

    fn to_message(&self) -> BackendResult<Message> {
        Ok(Message::text(serde_json::to_string(self)?))
    }
}

/// Payload of a `postgres_changes` frame
#[derive(Debug, Deserialize)]
struct ChangesPayload {
    data: ChangeData,
}

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

/// Build the realtime websocket URL from the project URL
fn realtime_url(base_url: &str, api_key: &str) -> String {
    let ws_base = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base_url.to_string()
    };

    format!(
        "{}/realtime/v1/websocket?apikey={}&vsn={}",
        ws_base.trim_end_matches('/'),
        urlencoding::encode(api_key),
        PROTOCOL_VERSION
    )
}

/// Decode a text frame into a change event for `table`, if it is one
fn parse_change(text: &str, table: &str) -> Option<ChangeEvent> {
    let frame: Frame = serde_json::from_str(text).ok()?;

    match frame.event.as_str() {
        "postgres_changes" => {}
        "phx_reply" => {
            if frame.payload.get("status").and_then(Value::as_str) == Some("error") {
                tracing::warn!(topic = %frame.topic, payload = %frame.payload, "Realtime join rejected");
            }
            return None;
        }
        "phx_error" | "system" => {
            tracing::debug!(topic = %frame.topic, event = %frame.event, payload = %frame.payload, "Realtime notice");
            return None;
        }
        _ => return None,
    }

    let payload: ChangesPayload = serde_json::from_value(frame.payload).ok()?;
    if payload.data.table != table {
        return None;
    }

    match payload.data.kind.as_str() {
        "INSERT" => Some(ChangeEvent::Insert {
            table: payload.data.table,
            new: payload.data.record?,
        }),
        "DELETE" => Some(ChangeEvent::Delete {
            table: payload.data.table,
            old: payload.data.old_record?,
        }),
        _ => None,
    }
}

/// Open a realtime subscription on `table`
pub(crate) async fn subscribe(config: &RestConfig, table: &str) -> BackendResult<Subscription> {
    let url = realtime_url(&config.base_url, &config.api_key);
    let (socket, _) = connect_async(url.as_str())
        .await
        .map_err(|e| BackendError::Realtime(format!("Failed to connect: {}", e)))?;

    let (mut sink, mut stream) = socket.split();
    let topic = format!("realtime:{}", table);

    sink.send(Frame::join(&topic, table, &config.api_key, 1).to_message()?)
        .await
        .map_err(|e| BackendError::Realtime(format!("Failed to join {}: {}", topic, e)))?;

    tracing::info!(topic = %topic, "Joined realtime channel");

    let (tx, events) = mpsc::channel(EVENT_QUEUE);
    let (leave_tx, mut leave_rx) = oneshot::channel::<()>();
    let heartbeat_every = Duration::from_secs(config.heartbeat_interval_secs.max(1));
    let channel = table.to_string();

    tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(heartbeat_every);
        // The first tick completes immediately
        heartbeat.tick().await;
        let mut next_ref: u64 = 2;

        loop {
            tokio::select! {
                _ = &mut leave_rx => {
                    if let Ok(leave) = Frame::new(&topic, "phx_leave", json!({}), next_ref).to_message() {
                        let _ = sink.send(leave).await;
                    }
                    let _ = sink.close().await;
                    break;
                }
                _ = heartbeat.tick() => {
                    let frame = Frame::new("phoenix", "heartbeat", json!({}), next_ref);
                    next_ref += 1;
                    let sent = match frame.to_message() {
                        Ok(message) => sink.send(message).await.is_ok(),
                        Err(_) => false,
                    };
                    if !sent {
                        tracing::warn!(topic = %topic, "Realtime heartbeat failed");
                        break;
                    }
                }
                incoming = stream.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(event) = parse_change(text.as_str(), &channel) {
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!(topic = %topic, "Realtime socket closed by server");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::warn!(topic = %topic, error = %e, "Realtime socket error");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    });

    Ok(Subscription::new(table, events, move || {
        let _ = leave_tx.send(());
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realtime_url() {
        assert_eq!(
            realtime_url("https://project.example.co", "anon key"),
            "wss://project.example.co/realtime/v1/websocket?apikey=anon%20key&vsn=1.0.0"
        );
        assert_eq!(
            realtime_url("http://localhost:54321", "k"),
            "ws://localhost:54321/realtime/v1/websocket?apikey=k&vsn=1.0.0"
        );
    }

    #[test]
    fn test_join_frame() {
        let frame = Frame::join("realtime:memos", "memos", "anon", 1);
        let json = serde_json::to_value(&frame).unwrap();

        assert_eq!(json["event"], "phx_join");
        assert_eq!(json["ref"], "1");
        let changes = json["payload"]["config"]["postgres_changes"]
            .as_array()
            .unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0]["event"], "INSERT");
        assert_eq!(changes[1]["table"], "memos");
    }

    #[test]
    fn test_parse_insert_change() {
        let text = r#"{
            "topic": "realtime:memos",
            "event": "postgres_changes",
            "payload": {"data": {"type": "INSERT", "table": "memos", "schema": "public",
                "record": {"id": 3, "content": "C"}, "commit_timestamp": "2024-01-01T00:00:00Z"},
                "ids": [1]},
            "ref": null
        }"#;

        let event = parse_change(text, "memos").unwrap();
        match event {
            ChangeEvent::Insert { table, new } => {
                assert_eq!(table, "memos");
                assert_eq!(new["content"], "C");
            }
            _ => panic!("Expected Insert"),
        }
    }

    #[test]
    fn test_parse_delete_change() {
        let text = r#"{"topic":"realtime:memos","event":"postgres_changes",
            "payload":{"data":{"type":"DELETE","table":"memos","old_record":{"id":1}}},"ref":null}"#;

        match parse_change(text, "memos").unwrap() {
            ChangeEvent::Delete { old, .. } => assert_eq!(old["id"], 1),
            _ => panic!("Expected Delete"),
        }
    }

    #[test]
    fn test_parse_ignores_other_frames() {
        let reply = r#"{"topic":"realtime:memos","event":"phx_reply","payload":{"status":"ok"},"ref":"1"}"#;
        assert!(parse_change(reply, "memos").is_none());

        let other_table = r#"{"topic":"realtime:memos","event":"postgres_changes",
            "payload":{"data":{"type":"INSERT","table":"users","record":{"id":1}}},"ref":null}"#;
        assert!(parse_change(other_table, "memos").is_none());

        assert!(parse_change("not json", "memos").is_none());
    }
}
