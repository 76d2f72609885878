/*
[INPUT]:  Phoenix channel frames from the realtime websocket
[OUTPUT]: Outbound join/heartbeat/leave frames and decoded change events
[POS]:    Realtime layer - wire format of the live change feed
[UPDATE]: When the realtime protocol version or payloads change
*/

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::http::{BackendError, Result};
use crate::types::{ChangeEvent, ChangeKind};

pub const EVENT_JOIN: &str = "phx_join";
pub const EVENT_LEAVE: &str = "phx_leave";
pub const EVENT_REPLY: &str = "phx_reply";
pub const EVENT_ERROR: &str = "phx_error";
pub const EVENT_CLOSE: &str = "phx_close";
pub const EVENT_HEARTBEAT: &str = "heartbeat";
pub const EVENT_POSTGRES_CHANGES: &str = "postgres_changes";
pub const PHOENIX_TOPIC: &str = "phoenix";

/// One Phoenix channel frame (protocol vsn 1.0.0)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

/// Meaning of an inbound frame for the subscriber
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Change(ChangeEvent),
    JoinReply { ok: bool, detail: Value },
    ChannelClosed(String),
    Ignored,
}

#[derive(Deserialize)]
struct ChangeData {
    #[serde(rename = "type")]
    kind: ChangeKind,
    #[serde(default)]
    record: Option<Value>,
    #[serde(default)]
    old_record: Option<Value>,
}

impl PhoenixMessage {
    /// Topic name for row changes on `table`
    pub fn topic_for(table: &str) -> String {
        format!("realtime:{table}")
    }

    pub fn join(table: &str, access_token: &str, reference: u64) -> Self {
        Self {
            topic: Self::topic_for(table),
            event: EVENT_JOIN.to_string(),
            payload: json!({
                "config": {
                    "broadcast": { "ack": false, "self": false },
                    "presence": { "key": "" },
                    "postgres_changes": [
                        { "event": "*", "schema": "public", "table": table }
                    ],
                    "private": false
                },
                "access_token": access_token
            }),
            reference: Some(reference.to_string()),
        }
    }

    pub fn heartbeat(reference: u64) -> Self {
        Self {
            topic: PHOENIX_TOPIC.to_string(),
            event: EVENT_HEARTBEAT.to_string(),
            payload: json!({}),
            reference: Some(reference.to_string()),
        }
    }

    pub fn leave(table: &str, reference: u64) -> Self {
        Self {
            topic: Self::topic_for(table),
            event: EVENT_LEAVE.to_string(),
            payload: json!({}),
            reference: Some(reference.to_string()),
        }
    }

    pub fn to_text(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Interpret a frame received on `topic`.
    ///
    /// Heartbeat replies and frames for other topics are ignored.
    pub fn classify(self, topic: &str, join_ref: &str) -> Result<Inbound> {
        if self.topic != topic {
            return Ok(Inbound::Ignored);
        }

        match self.event.as_str() {
            EVENT_POSTGRES_CHANGES => {
                let data = self
                    .payload
                    .get("data")
                    .cloned()
                    .ok_or_else(|| BackendError::InvalidResponse("postgres_changes without data".to_string()))?;
                let data: ChangeData = serde_json::from_value(data)?;
                Ok(Inbound::Change(ChangeEvent::from_parts(
                    data.kind,
                    data.record,
                    data.old_record,
                )?))
            }
            EVENT_REPLY if self.reference.as_deref() == Some(join_ref) => {
                let ok = self.payload.get("status").and_then(Value::as_str) == Some("ok");
                let detail = self.payload.get("response").cloned().unwrap_or(Value::Null);
                Ok(Inbound::JoinReply { ok, detail })
            }
            EVENT_ERROR | EVENT_CLOSE => Ok(Inbound::ChannelClosed(self.event)),
            _ => Ok(Inbound::Ignored),
        }
    }
}
