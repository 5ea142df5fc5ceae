// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Normalizes a raw ingestion line — either an already-normalized event or a
//! raw hook payload — into the closed [`EventKind`] set. Idempotent at the
//! line level: duplicate detection by `event.id` happens downstream, in the
//! event log.

use serde_json::Value;

use crate::event::{Event, EventKind};

/// Field paths searched, in order, for the agent's own session identifier.
const SESSION_ID_FIELDS: &[&str] = &["session_id", "sessionId", "agent_session_id"];
/// Field paths searched, in order, for the working directory.
const CWD_FIELDS: &[&str] = &["cwd", "cwd_path", "workingDirectory"];
/// Field paths searched, in order, for the owning agent adapter's name.
const AGENT_FIELDS: &[&str] = &["agent", "agent_name"];
/// Field paths searched, in order, for the pre/post tool-use correlation key.
const TOOL_USE_ID_FIELDS: &[&str] = &["toolUseId", "tool_use_id"];
/// Field paths searched, in order, for the event timestamp.
const TIMESTAMP_FIELDS: &[&str] = &["timestamp", "ts"];

/// Maps both the already-normalized snake_case kind strings and the real
/// hooks' CamelCase `hook_event_name` values onto the same closed set.
fn kind_from_str(s: &str) -> Option<EventKind> {
    match s {
        "session_start" | "SessionStart" => Some(EventKind::SessionStart),
        "session_end" | "SessionEnd" => Some(EventKind::SessionEnd),
        "user_prompt_submit" | "UserPromptSubmit" => Some(EventKind::UserPromptSubmit),
        "pre_tool_use" | "PreToolUse" => Some(EventKind::PreToolUse),
        "post_tool_use" | "PostToolUse" => Some(EventKind::PostToolUse),
        "stop" | "Stop" => Some(EventKind::Stop),
        "subagent_stop" | "SubagentStop" => Some(EventKind::SubagentStop),
        "notification" | "Notification" => Some(EventKind::Notification),
        _ => None,
    }
}

fn find_str_field<'a>(value: &'a Value, fields: &[&str]) -> Option<&'a str> {
    for field in fields {
        if let Some(s) = value.get(field).and_then(Value::as_str) {
            return Some(s);
        }
    }
    None
}

fn find_u64_field(value: &Value, fields: &[&str]) -> Option<u64> {
    for field in fields {
        if let Some(n) = value.get(field).and_then(Value::as_u64) {
            return Some(n);
        }
    }
    None
}

/// Process one raw line, producing a normalized event. Returns `None` if the
/// line carries neither a recognized `"type"` nor a mappable
/// `hook_event_name`.
pub fn process_line(raw: &str, trace: bool) -> Option<Event> {
    let value: Value = serde_json::from_str(raw).ok()?;

    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .and_then(kind_from_str)
        .or_else(|| value.get("hook_event_name").and_then(Value::as_str).and_then(kind_from_str))?;

    let agent_session_id = find_str_field(&value, SESSION_ID_FIELDS).unwrap_or_default().to_owned();
    let cwd = find_str_field(&value, CWD_FIELDS).unwrap_or_default().to_owned();
    let agent = find_str_field(&value, AGENT_FIELDS).unwrap_or_default().to_owned();

    if trace {
        tracing::trace!(
            kind = ?kind,
            agent_session_id,
            cwd,
            "event processor normalized a line"
        );
    }

    let id = value
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let timestamp = find_u64_field(&value, TIMESTAMP_FIELDS).unwrap_or_else(Event::now_ms);

    Some(Event {
        id,
        timestamp,
        kind,
        session_id: None,
        cwd,
        tool: value.get("tool_name").or_else(|| value.get("tool")).and_then(Value::as_str).map(str::to_owned),
        tool_input: value.get("tool_input").cloned(),
        tool_response: value.get("tool_response").cloned(),
        tool_use_id: find_str_field(&value, TOOL_USE_ID_FIELDS).map(str::to_owned),
        assistant_text: value.get("assistant_text").and_then(Value::as_str).map(str::to_owned),
        response: value.get("response").and_then(Value::as_str).map(str::to_owned),
        duration: None,
        agent_session_id,
        agent,
    })
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;
