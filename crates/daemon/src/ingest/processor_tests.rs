// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn already_normalized_line_passes_through_with_backfilled_id() {
    let line = r#"{"type":"pre_tool_use","session_id":"sid-1","cwd":"/tmp/proj","tool_name":"Bash"}"#;
    let event = process_line(line, false).expect("parses");
    assert_eq!(event.kind, EventKind::PreToolUse);
    assert_eq!(event.agent_session_id, "sid-1");
    assert_eq!(event.cwd, "/tmp/proj");
    assert_eq!(event.tool.as_deref(), Some("Bash"));
    assert!(!event.id.is_empty());
}

#[test]
fn hook_event_name_maps_to_closed_set() {
    let line = r#"{"hook_event_name":"UserPromptSubmit","session_id":"sid-2","cwd":"/tmp/proj"}"#;
    let event = process_line(line, false).expect("parses");
    assert_eq!(event.kind, EventKind::UserPromptSubmit);
    assert_eq!(event.agent_session_id, "sid-2");
}

#[test]
fn hook_event_name_reads_camel_case_tool_use_id_and_ts() {
    let line = r#"{"hook_event_name":"PreToolUse","tool":"Bash","toolUseId":"t1","session_id":"agentSid","cwd":"/tmp/work","ts":1000}"#;
    let event = process_line(line, false).expect("parses");
    assert_eq!(event.kind, EventKind::PreToolUse);
    assert_eq!(event.tool_use_id.as_deref(), Some("t1"));
    assert_eq!(event.timestamp, 1000);
}

#[test]
fn unknown_kind_returns_none() {
    let line = r#"{"type":"totally_unknown"}"#;
    assert!(process_line(line, false).is_none());
}

#[test]
fn malformed_json_returns_none() {
    assert!(process_line("not json", false).is_none());
}

#[test]
fn explicit_id_and_timestamp_are_preserved() {
    let line = r#"{"type":"stop","id":"evt-123","timestamp":42,"session_id":"sid","cwd":"/tmp"}"#;
    let event = process_line(line, false).expect("parses");
    assert_eq!(event.id, "evt-123");
    assert_eq!(event.timestamp, 42);
}
