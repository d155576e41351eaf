//! Message envelope types and dual-format decoding.
//!
//! Every structured message on the wire — request or response — shares the
//! `{type, id?, data?, timestamp}` envelope shape. A response echoes the
//! request's `id` when present so the caller can correlate asynchronous
//! replies. Lines that do not parse as a JSON object fall back to the
//! plain-text command grammar handled by the dispatcher.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outbound message envelope.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Envelope {
    /// Message type tag.
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Correlation id echoed from the request, when it carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Structured payload; shape depends on the message type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Creation time in epoch milliseconds.
    pub timestamp: i64,
}

impl Envelope {
    /// Build an envelope with the current timestamp.
    #[must_use]
    pub fn new(msg_type: impl Into<String>, id: Option<String>, data: Option<Value>) -> Self {
        Self {
            msg_type: msg_type.into(),
            id,
            data,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// `pong` reply to a `ping` request.
    #[must_use]
    pub fn pong(id: Option<String>) -> Self {
        Self::new("pong", id, Some(Value::String("pong".into())))
    }

    /// Generic `response` envelope carrying a command result.
    #[must_use]
    pub fn response(id: Option<String>, data: Value) -> Self {
        Self::new("response", id, Some(data))
    }

    /// Protocol-level error envelope. Carries no correlation id.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new("error", None, Some(Value::String(message.into())))
    }

    /// Domain error envelope categorized `VOICE_TEST_ERROR`.
    ///
    /// Lets callers distinguish voice test precondition failures from
    /// protocol errors. The request id is echoed on a best-effort basis.
    #[must_use]
    pub fn voice_error(id: Option<String>, message: impl Into<String>) -> Self {
        Self::new(
            "error",
            id,
            Some(serde_json::json!({
                "error": message.into(),
                "category": "VOICE_TEST_ERROR",
            })),
        )
    }

    /// Serialize to a single JSON line (no trailing newline).
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"type":"error","data":"serialization failed"}"#.to_owned())
    }
}

/// Inbound message envelope.
///
/// Every field is optional so that any JSON object parses; a missing `type`
/// is reported by the dispatcher as a format error rather than falling back
/// to the text grammar.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct InboundEnvelope {
    /// Message type tag, when present.
    #[serde(rename = "type")]
    pub msg_type: Option<String>,
    /// Correlation id supplied by the caller.
    #[serde(default)]
    pub id: Option<String>,
    /// Structured payload.
    #[serde(default)]
    pub data: Option<Value>,
    /// Sender-side creation time, ignored by the bridge.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Result of decoding one inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// The line parsed as a JSON object envelope.
    Json(InboundEnvelope),
    /// The line was not a JSON object; handle it as a text command.
    Text(String),
}

/// Decode one inbound line, JSON-object-first with plain-text fallback.
///
/// JSON scalars and arrays are not envelopes and take the text path, which
/// ultimately reports them as unknown commands.
#[must_use]
pub fn decode(line: &str) -> Decoded {
    match serde_json::from_str::<InboundEnvelope>(line) {
        Ok(envelope) => Decoded::Json(envelope),
        Err(_) => Decoded::Text(line.to_owned()),
    }
}
