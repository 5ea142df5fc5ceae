// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The normalized event shape that flows through the ingestion pipeline,
//! and the small set of value types attached to sessions that are produced
//! outside the registry's own state machine (scraper output, token usage).

use serde::{Deserialize, Serialize};

/// The closed set of event kinds the registry's state machine understands.
/// Anything else is rejected by the event processor before it reaches here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SessionStart,
    SessionEnd,
    UserPromptSubmit,
    PreToolUse,
    PostToolUse,
    Stop,
    SubagentStop,
    Notification,
}

/// A normalized event, already routed to a registry session id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub timestamp: u64,
    pub kind: EventKind,
    /// Absent until routing assigns it via `findOrCreateSession`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub cwd: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_response: Option<serde_json::Value>,
    /// Correlation key shared by a `pre_tool_use`/`post_tool_use` pair.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Set on `post_tool_use` only: `timestamp - matching pre.timestamp`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    /// The agent's own session identifier, extracted by the event processor.
    /// Not part of the wire shape broadcast to subscribers; used for routing.
    #[serde(skip)]
    pub agent_session_id: String,
    /// Which agent adapter this line belongs to. Extracted from the payload,
    /// or stamped by the `/event/<agent>` path before ingestion. Not part of
    /// the wire shape broadcast to subscribers; used for routing.
    #[serde(skip)]
    pub agent: String,
}

impl Event {
    /// Current epoch milliseconds, used wherever a fresh timestamp is needed.
    pub fn now_ms() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Scraper output recorded while a permission prompt is on screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPermission {
    pub tool: Option<String>,
    pub context: String,
    pub options: Vec<PermissionOption>,
    pub detected_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionOption {
    pub number: u32,
    pub label: String,
}

/// Token-usage tracking state maintained by the token counter scraper.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokenData {
    pub last_seen: u64,
    pub cumulative: u64,
    pub last_update: u64,
}
