// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::Config;
use crate::push::PushHub;
use crate::session::adapter::AdapterTable;
use std::path::Path;
use std::sync::Arc;

fn make_config(dir: &Path) -> Config {
    Config {
        port: 0,
        host: "127.0.0.1".into(),
        allowed_origin: None,
        events_file: Some(dir.join("events.jsonl")),
        sessions_file: Some(dir.join("sessions.json")),
        metadata_file: Some(dir.join("metadata.json")),
        tiles_file: Some(dir.join("tiles.json")),
        max_events: 100,
        tmux_session_prefix: "test".into(),
        debug: false,
        trace: false,
        log_format: "json".into(),
        log_level: "info".into(),
    }
}

fn registry(dir: &Path) -> Registry {
    Registry::load(Arc::new(make_config(dir)), Arc::new(AdapterTable::with_defaults()), Arc::new(PushHub::new()))
}

#[tokio::test]
async fn already_normalized_line_is_appended_and_routed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = registry(dir.path());
    let log = EventLog::new(dir.path().join("events.jsonl"), 100);

    let raw = r#"{"id":"e1","type":"user_prompt_submit","session_id":"abc","cwd":"/tmp/proj"}"#;
    let event = ingest_line(&registry, &log, raw, false, Some("agent-a")).await.expect("routed");

    assert_eq!(event.session_id.as_deref().map(|s| !s.is_empty()), Some(true));
    assert_eq!(registry.list().await.len(), 1);
}

#[tokio::test]
async fn duplicate_id_is_not_routed_twice() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = registry(dir.path());
    let log = EventLog::new(dir.path().join("events.jsonl"), 100);

    let raw = r#"{"id":"e1","type":"user_prompt_submit","session_id":"abc","cwd":"/tmp/proj"}"#;
    ingest_line(&registry, &log, raw, false, Some("agent-a")).await;
    let second = ingest_line(&registry, &log, raw, false, Some("agent-a")).await;

    assert!(second.is_none());
    assert_eq!(registry.list().await.len(), 1);
}

#[tokio::test]
async fn line_with_no_routable_identity_is_kept_in_history_only() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = registry(dir.path());
    let log = EventLog::new(dir.path().join("events.jsonl"), 100);

    let raw = r#"{"id":"e1","type":"notification"}"#;
    let event = ingest_line(&registry, &log, raw, false, None).await.expect("kept for history");

    assert!(event.session_id.is_none());
    assert!(registry.list().await.is_empty());
}

#[tokio::test]
async fn matched_pre_and_post_tool_use_carries_duration() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = registry(dir.path());
    let log = EventLog::new(dir.path().join("events.jsonl"), 100);

    let base = crate::event::Event::now_ms();
    let pre = format!(
        r#"{{"id":"e1","hook_event_name":"PreToolUse","tool":"Bash","toolUseId":"t1","session_id":"agentSid","cwd":"/tmp/work","ts":{base}}}"#
    );
    ingest_line(&registry, &log, &pre, false, Some("agent-a")).await.expect("routed");

    let post = format!(
        r#"{{"id":"e2","hook_event_name":"PostToolUse","toolUseId":"t1","session_id":"agentSid","cwd":"/tmp/work","ts":{}}}"#,
        base + 420
    );
    let event = ingest_line(&registry, &log, &post, false, Some("agent-a")).await.expect("routed");

    assert_eq!(event.duration, Some(420));
}

#[tokio::test]
async fn event_outside_replay_window_does_not_create_a_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = registry(dir.path());
    let log = EventLog::new(dir.path().join("events.jsonl"), 100);

    let raw = r#"{"id":"e1","hook_event_name":"UserPromptSubmit","session_id":"ancient","cwd":"/tmp/proj","ts":1}"#;
    let event = ingest_line(&registry, &log, raw, false, Some("agent-a")).await.expect("kept for history");

    assert!(event.session_id.is_none());
    assert!(registry.list().await.is_empty());
}

#[tokio::test]
async fn unparseable_line_is_ignored() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = registry(dir.path());
    let log = EventLog::new(dir.path().join("events.jsonl"), 100);

    let result = ingest_line(&registry, &log, "not json", false, Some("agent-a")).await;
    assert!(result.is_none());
}
