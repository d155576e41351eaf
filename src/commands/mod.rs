//! Command dispatch: routes decoded messages to the command table.
//!
//! One [`Dispatcher`] is shared by every session. Text commands reply with
//! raw text lines; structured envelopes reply with JSON envelopes. Voice
//! command precondition failures are categorized `VOICE_TEST_ERROR` so
//! callers can tell domain errors from protocol errors.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::DeviceConfig;
use crate::protocol::{decode, Decoded, Envelope, InboundEnvelope};
use crate::voice::VoiceTestEngine;

/// Fixed reply for the `hello` text command.
const HELLO_REPLY: &str = "Hello from ADB Bridge Server!";

/// Fixed reply for the `status` text command.
const STATUS_REPLY: &str = "Server is running";

/// Fixed reply for the `test` structured command.
const TEST_REPLY: &str = "Test command executed successfully";

/// Default parameters applied when `voice_start_test` omits them.
const DEFAULT_TITLE: &str = "default phrase";
const DEFAULT_AREA: &str = "2";

/// Shared command dispatcher handed to every session.
#[derive(Debug)]
pub struct Dispatcher {
    engine: Arc<VoiceTestEngine>,
    device: DeviceConfig,
}

impl Dispatcher {
    /// Build a dispatcher over the job engine and device descriptor.
    #[must_use]
    pub fn new(engine: Arc<VoiceTestEngine>, device: DeviceConfig) -> Self {
        Self { engine, device }
    }

    /// Handle one inbound line and produce the reply line, if any.
    ///
    /// The reply is already encoded: a JSON envelope for structured
    /// requests, raw text for text-grammar requests.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        if line.trim().is_empty() {
            return Some(Envelope::error("empty message").to_json());
        }

        // The raw line is passed through: the JSON parser tolerates
        // surrounding whitespace, and `echo` needs it intact.
        match decode(line) {
            Decoded::Json(envelope) => Some(self.process_envelope(envelope).await.to_json()),
            Decoded::Text(text) => Some(handle_text(&text)),
        }
    }

    /// Dispatch a structured envelope by its `type` tag.
    async fn process_envelope(&self, envelope: InboundEnvelope) -> Envelope {
        let Some(msg_type) = envelope.msg_type.clone() else {
            return Envelope::error("invalid message format");
        };

        debug!(%msg_type, "processing message");

        match msg_type.as_str() {
            "ping" => Envelope::pong(envelope.id),
            "echo" => Envelope::new("response", envelope.id, envelope.data),
            "command" => self.handle_command(envelope).await,
            other => Envelope::error(format!("Unknown message type: {other}")),
        }
    }

    /// Extract the command name from `data` and run the command table.
    async fn handle_command(&self, envelope: InboundEnvelope) -> Envelope {
        let id = envelope.id;
        let Some(data) = envelope.data else {
            return Envelope::error("command data is empty");
        };

        let command = match &data {
            Value::String(name) => name.clone(),
            Value::Object(map) => match map.get("command") {
                Some(value) => value_to_string(value),
                None => return Envelope::error("missing command field"),
            },
            other => other.to_string(),
        };

        debug!(%command, "executing command");

        match command.as_str() {
            "get_device_info" => Envelope::response(id, self.device_info()),
            "get_time" => Envelope::response(id, Value::from(Utc::now().timestamp_millis())),
            "test" => Envelope::response(id, Value::String(TEST_REPLY.into())),
            "voice_init" => self.voice_init(id),
            "voice_start_test" => self.voice_start_test(id, &data).await,
            "voice_get_result" => self.voice_get_result(id).await,
            "voice_check_result" => self.voice_check_result(id).await,
            "voice_get_status" => self.voice_get_status(id).await,
            other => Envelope::error(format!("Unknown command: {other}")),
        }
    }

    /// Static device descriptor plus the read timestamp.
    fn device_info(&self) -> Value {
        json!({
            "model": self.device.model,
            "manufacturer": self.device.manufacturer,
            "osVersion": self.device.os_version,
            "sdkLevel": self.device.sdk_level,
            "timestamp": Utc::now().timestamp_millis(),
        })
    }

    /// `voice_init` — initialization happens externally; this only reports
    /// the gate.
    fn voice_init(&self, id: Option<String>) -> Envelope {
        if self.engine.is_initialized() {
            Envelope::response(id, Value::String("voice test engine initialized".into()))
        } else {
            Envelope::voice_error(id, "voice test engine not initialized")
        }
    }

    /// `voice_start_test` — start a job with optional title/area parameters.
    async fn voice_start_test(&self, id: Option<String>, data: &Value) -> Envelope {
        if !self.engine.is_initialized() {
            return Envelope::voice_error(id, "voice test engine not initialized");
        }

        let mut title = DEFAULT_TITLE.to_owned();
        let mut area = DEFAULT_AREA.to_owned();
        if let Value::Object(params) = data {
            if let Some(value) = params.get("title") {
                title = value_to_string(value);
            }
            if let Some(value) = params.get("area") {
                area = value_to_string(value);
            }
        }

        match self.engine.start(&title, &area).await {
            Ok(_exe_id) => Envelope::response(
                id,
                json!({
                    "message": "voice test started",
                    "title": title,
                    "area": area,
                    "status": "testing",
                }),
            ),
            Err(err) => Envelope::voice_error(id, format!("failed to start voice test: {err}")),
        }
    }

    /// `voice_get_result` — consume the result if ready.
    async fn voice_get_result(&self, id: Option<String>) -> Envelope {
        if !self.engine.is_initialized() {
            return Envelope::voice_error(id, "voice test engine not initialized");
        }

        match self.engine.consume().await {
            Some((result, exe_id)) => Envelope::response(
                id,
                json!({
                    "result": result,
                    "exeID": exe_id,
                    "status": "completed",
                }),
            ),
            None => Envelope::response(
                id,
                json!({
                    "message": "test result not ready yet",
                    "status": "testing",
                }),
            ),
        }
    }

    /// `voice_check_result` — readiness peek, no mutation.
    async fn voice_check_result(&self, id: Option<String>) -> Envelope {
        if !self.engine.is_initialized() {
            return Envelope::voice_error(id, "voice test engine not initialized");
        }

        let has_result = self.engine.has_result().await;
        Envelope::response(
            id,
            json!({
                "hasResult": has_result,
                "status": if has_result { "completed" } else { "testing" },
            }),
        )
    }

    /// `voice_get_status` — engine snapshot, allowed even before init.
    async fn voice_get_status(&self, id: Option<String>) -> Envelope {
        let status = self.engine.status().await;
        Envelope::response(id, serde_json::to_value(status).unwrap_or(Value::Null))
    }
}

/// Handle a line in the plain-text command grammar.
///
/// Replies are raw text, not envelopes: `ping` → `pong`, `hello` and
/// `status` → fixed strings, `echo <rest>` → `<rest>` verbatim (the rest may
/// be empty), anything else → `Unknown command: <text>`.
#[must_use]
pub fn handle_text(text: &str) -> String {
    let keyword = text.trim();
    let lower = keyword.to_lowercase();

    if lower == "ping" {
        return "pong".to_owned();
    }
    if lower == "hello" {
        return HELLO_REPLY.to_owned();
    }
    if lower == "status" {
        return STATUS_REPLY.to_owned();
    }
    // `echo <rest>`: keyword match is case-insensitive, rest is verbatim and
    // may be empty, so only leading whitespace is stripped before the check.
    let line = text.trim_start();
    if let (Some(prefix), Some(rest)) = (line.get(..5), line.get(5..)) {
        if prefix.eq_ignore_ascii_case("echo ") {
            return rest.to_owned();
        }
    }
    format!("Unknown command: {keyword}")
}

/// Render a JSON value as a command parameter string.
///
/// Strings are taken verbatim; other values use their JSON text.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
