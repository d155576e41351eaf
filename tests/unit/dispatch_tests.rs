//! Unit tests for envelope dispatch and the command table.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use adb_bridge::commands::Dispatcher;
use adb_bridge::config::DeviceConfig;
use adb_bridge::voice::VoiceTestEngine;

fn dispatcher_with_engine() -> (Dispatcher, Arc<VoiceTestEngine>) {
    let engine = Arc::new(VoiceTestEngine::new(Duration::ZERO));
    let dispatcher = Dispatcher::new(Arc::clone(&engine), DeviceConfig::default());
    (dispatcher, engine)
}

async fn reply_json(dispatcher: &Dispatcher, line: &str) -> Value {
    let reply = dispatcher
        .handle_line(line)
        .await
        .expect("a reply must be produced");
    serde_json::from_str(&reply).expect("reply must be valid JSON")
}

/// `{type:"ping", id:X}` always yields `{type:"pong", id:X, data:"pong"}`.
#[tokio::test]
async fn ping_envelope_yields_pong_with_same_id() {
    let (dispatcher, _engine) = dispatcher_with_engine();

    let value = reply_json(&dispatcher, r#"{"type":"ping","id":"req-1"}"#).await;

    assert_eq!(value["type"], "pong");
    assert_eq!(value["id"], "req-1");
    assert_eq!(value["data"], "pong");
}

/// `{type:"echo", id:X, data:D}` echoes `D` unchanged under `id=X`.
#[tokio::test]
async fn echo_envelope_echoes_data_unchanged() {
    let (dispatcher, _engine) = dispatcher_with_engine();

    let value = reply_json(
        &dispatcher,
        r#"{"type":"echo","id":"e1","data":{"k":[1,2],"b":true}}"#,
    )
    .await;

    assert_eq!(value["type"], "response");
    assert_eq!(value["id"], "e1");
    assert_eq!(value["data"], serde_json::json!({"k": [1, 2], "b": true}));
}

#[tokio::test]
async fn unknown_type_yields_error_envelope() {
    let (dispatcher, _engine) = dispatcher_with_engine();

    let value = reply_json(&dispatcher, r#"{"type":"bogus","id":"1"}"#).await;

    assert_eq!(value["type"], "error");
    assert_eq!(value["data"], "Unknown message type: bogus");
}

#[tokio::test]
async fn missing_type_yields_format_error() {
    let (dispatcher, _engine) = dispatcher_with_engine();

    let value = reply_json(&dispatcher, r#"{"id":"1","data":"x"}"#).await;

    assert_eq!(value["type"], "error");
    assert_eq!(value["data"], "invalid message format");
}

/// An empty or whitespace-only line gets an error envelope, keeping the
/// connection usable.
#[tokio::test]
async fn empty_line_yields_error_envelope() {
    let (dispatcher, _engine) = dispatcher_with_engine();

    let value = reply_json(&dispatcher, "   ").await;

    assert_eq!(value["type"], "error");
    assert_eq!(value["data"], "empty message");
}

/// An `echo ` line with nothing after the space travels the text path and
/// replies with the empty string.
#[tokio::test]
async fn echo_with_empty_rest_replies_empty_line() {
    let (dispatcher, _engine) = dispatcher_with_engine();

    let reply = dispatcher
        .handle_line("echo ")
        .await
        .expect("a reply must be produced");

    assert_eq!(reply, "");
}

/// Command name as a plain data string.
#[tokio::test]
async fn get_time_returns_epoch_millis() {
    let (dispatcher, _engine) = dispatcher_with_engine();

    let before = chrono::Utc::now().timestamp_millis();
    let value = reply_json(&dispatcher, r#"{"type":"command","id":"t","data":"get_time"}"#).await;
    let after = chrono::Utc::now().timestamp_millis();

    assert_eq!(value["type"], "response");
    assert_eq!(value["id"], "t");
    let millis = value["data"].as_i64().expect("data must be an integer");
    assert!((before..=after).contains(&millis), "clock reading in range");
}

#[tokio::test]
async fn test_command_returns_fixed_string() {
    let (dispatcher, _engine) = dispatcher_with_engine();

    let value = reply_json(&dispatcher, r#"{"type":"command","data":"test"}"#).await;

    assert_eq!(value["data"], "Test command executed successfully");
}

/// Command name extracted from the `command` field of an object payload.
#[tokio::test]
async fn object_payload_uses_command_field() {
    let (dispatcher, _engine) = dispatcher_with_engine();

    let value = reply_json(
        &dispatcher,
        r#"{"type":"command","id":"c","data":{"command":"test"}}"#,
    )
    .await;

    assert_eq!(value["type"], "response");
    assert_eq!(value["data"], "Test command executed successfully");
}

#[tokio::test]
async fn object_payload_without_command_field_errors() {
    let (dispatcher, _engine) = dispatcher_with_engine();

    let value = reply_json(&dispatcher, r#"{"type":"command","data":{"x":1}}"#).await;

    assert_eq!(value["type"], "error");
    assert_eq!(value["data"], "missing command field");
}

#[tokio::test]
async fn missing_data_errors() {
    let (dispatcher, _engine) = dispatcher_with_engine();

    let value = reply_json(&dispatcher, r#"{"type":"command"}"#).await;

    assert_eq!(value["type"], "error");
    assert_eq!(value["data"], "command data is empty");
}

/// A non-string, non-object payload stringifies to a command name, which is
/// then unknown.
#[tokio::test]
async fn scalar_payload_stringifies_to_command_name() {
    let (dispatcher, _engine) = dispatcher_with_engine();

    let value = reply_json(&dispatcher, r#"{"type":"command","data":42}"#).await;

    assert_eq!(value["type"], "error");
    assert_eq!(value["data"], "Unknown command: 42");
}

#[tokio::test]
async fn unknown_command_name_errors() {
    let (dispatcher, _engine) = dispatcher_with_engine();

    let value = reply_json(&dispatcher, r#"{"type":"command","data":"reboot"}"#).await;

    assert_eq!(value["type"], "error");
    assert_eq!(value["data"], "Unknown command: reboot");
}

/// Device info reflects the configured descriptor, with a fresh timestamp.
#[tokio::test]
async fn get_device_info_reports_descriptor() {
    let (dispatcher, _engine) = dispatcher_with_engine();

    let value = reply_json(
        &dispatcher,
        r#"{"type":"command","id":"d","data":"get_device_info"}"#,
    )
    .await;

    let defaults = DeviceConfig::default();
    assert_eq!(value["type"], "response");
    assert_eq!(value["data"]["model"], defaults.model);
    assert_eq!(value["data"]["manufacturer"], defaults.manufacturer);
    assert_eq!(value["data"]["osVersion"], defaults.os_version);
    assert_eq!(value["data"]["sdkLevel"], defaults.sdk_level);
    assert!(value["data"]["timestamp"].is_i64());
}

// ── Voice commands ───────────────────────────────────────────────────────────

/// Uninitialized voice commands return categorized `VOICE_TEST_ERROR`
/// envelopes so callers can tell domain errors from protocol errors.
#[tokio::test]
async fn uninitialized_voice_start_is_categorized_error() {
    let (dispatcher, _engine) = dispatcher_with_engine();

    let value = reply_json(
        &dispatcher,
        r#"{"type":"command","id":"2","data":{"command":"voice_start_test"}}"#,
    )
    .await;

    assert_eq!(value["type"], "error");
    assert_eq!(value["id"], "2");
    assert_eq!(value["data"]["category"], "VOICE_TEST_ERROR");
}

#[tokio::test]
async fn uninitialized_voice_check_is_categorized_error() {
    let (dispatcher, _engine) = dispatcher_with_engine();

    let value = reply_json(
        &dispatcher,
        r#"{"type":"command","data":"voice_check_result"}"#,
    )
    .await;

    assert_eq!(value["type"], "error");
    assert_eq!(value["data"]["category"], "VOICE_TEST_ERROR");
}

/// `voice_get_status` has no precondition and reports the gate state.
#[tokio::test]
async fn voice_get_status_works_uninitialized() {
    let (dispatcher, _engine) = dispatcher_with_engine();

    let value = reply_json(&dispatcher, r#"{"type":"command","data":"voice_get_status"}"#).await;

    assert_eq!(value["type"], "response");
    assert_eq!(value["data"]["initialized"], false);
    assert_eq!(value["data"]["hasResult"], false);
    assert_eq!(value["data"]["testCount"], 0);
}

#[tokio::test]
async fn voice_init_reports_gate_state() {
    let (dispatcher, engine) = dispatcher_with_engine();

    let value = reply_json(&dispatcher, r#"{"type":"command","data":"voice_init"}"#).await;
    assert_eq!(value["data"]["category"], "VOICE_TEST_ERROR");

    engine.init().await;
    let value = reply_json(&dispatcher, r#"{"type":"command","data":"voice_init"}"#).await;
    assert_eq!(value["type"], "response");
    assert_eq!(value["data"], "voice test engine initialized");
}

/// `voice_start_test` echoes title/area and reports status `testing`;
/// omitted parameters fall back to defaults.
#[tokio::test]
async fn voice_start_test_echoes_parameters() {
    let (dispatcher, engine) = dispatcher_with_engine();
    engine.init().await;

    let value = reply_json(
        &dispatcher,
        r#"{"type":"command","id":"s","data":{"command":"voice_start_test","title":"hi","area":"1"}}"#,
    )
    .await;

    assert_eq!(value["type"], "response");
    assert_eq!(value["id"], "s");
    assert_eq!(value["data"]["title"], "hi");
    assert_eq!(value["data"]["area"], "1");
    assert_eq!(value["data"]["status"], "testing");
}

#[tokio::test]
async fn voice_start_test_applies_defaults() {
    let (dispatcher, engine) = dispatcher_with_engine();
    engine.init().await;

    let value = reply_json(
        &dispatcher,
        r#"{"type":"command","data":{"command":"voice_start_test"}}"#,
    )
    .await;

    assert_eq!(value["data"]["title"], "default phrase");
    assert_eq!(value["data"]["area"], "2");
}

/// Full poll-and-consume flow under a paused clock: the result is not ready
/// before 2 s, is ready by 5 s, and is consumed exactly once.
#[tokio::test(start_paused = true)]
async fn voice_result_flow_consume_once() {
    let (dispatcher, engine) = dispatcher_with_engine();
    engine.init().await;

    reply_json(
        &dispatcher,
        r#"{"type":"command","data":{"command":"voice_start_test","title":"hi","area":"1"}}"#,
    )
    .await;

    // Not ready before the 2 s lower bound.
    tokio::time::sleep(Duration::from_millis(1999)).await;
    let value = reply_json(&dispatcher, r#"{"type":"command","data":"voice_check_result"}"#).await;
    assert_eq!(value["data"]["hasResult"], false);
    assert_eq!(value["data"]["status"], "testing");

    // Guaranteed ready by the 5 s upper bound.
    tokio::time::sleep(Duration::from_millis(3001)).await;
    let value = reply_json(&dispatcher, r#"{"type":"command","data":"voice_check_result"}"#).await;
    assert_eq!(value["data"]["hasResult"], true);
    assert_eq!(value["data"]["status"], "completed");

    // First consume wins.
    let value = reply_json(&dispatcher, r#"{"type":"command","data":"voice_get_result"}"#).await;
    assert_eq!(value["data"]["status"], "completed");
    assert!(value["data"]["result"].as_str().is_some_and(|s| !s.is_empty()));
    assert!(value["data"]["exeID"]
        .as_str()
        .is_some_and(|s| s.starts_with("VOICE_TEST_")));

    // Second immediate call sees the empty slot.
    let value = reply_json(&dispatcher, r#"{"type":"command","data":"voice_get_result"}"#).await;
    assert_eq!(value["data"]["status"], "testing");
    let value = reply_json(&dispatcher, r#"{"type":"command","data":"voice_check_result"}"#).await;
    assert_eq!(value["data"]["hasResult"], false);
}
