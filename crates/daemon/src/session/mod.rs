// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The session entity, its lifecycle state machine, identity indices, and
//! persistence. The registry is the single owner of this state; scrapers and
//! schedulers hold session ids, never references into the map.

pub mod adapter;
pub mod persistence;
pub mod registry;

use serde::{Deserialize, Serialize};

use crate::event::{PendingPermission, SessionTokenData};

/// Kind of session container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Internal,
    External,
}

/// Lifecycle status (I4: alive iff not Offline).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Idle,
    Working,
    Waiting,
    Offline,
}

/// Terminal container descriptor. Internal sessions always carry the
/// multiplexer session name (I2); external sessions carry an optional
/// descriptor captured from a start hook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplexer_session: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pane_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tty: Option<String>,
}

impl TerminalDescriptor {
    pub fn is_empty(&self) -> bool {
        self.multiplexer_session.is_none()
            && self.pane_id.is_none()
            && self.socket.is_none()
            && self.tty.is_none()
    }
}

/// A supervised coding-assistant session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub name: String,
    pub kind: SessionKind,
    pub agent: String,
    pub status: Status,
    pub terminal: TerminalDescriptor,
    pub cwd: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_position: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    pub auto_accept: bool,
    pub created_at: u64,
    pub last_activity: u64,

    // Opaque attachments merged at read time from the metadata store and
    // external collaborators. Never interpreted by the registry itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_status: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_quota: Option<serde_json::Value>,

    // Per-session scraper state. Written only by their respective scrapers
    // (see the concurrency model's shared-resource policy).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_permission: Option<PendingPermission>,
    #[serde(default)]
    pub tokens: SessionTokenData,
    #[serde(default)]
    pub bypass_warning_handled: bool,
}

impl Session {
    /// I5: currentTool is non-absent only while status is working or waiting.
    pub fn current_tool_invariant_holds(&self) -> bool {
        self.current_tool.is_none() || matches!(self.status, Status::Working | Status::Waiting)
    }

    /// I4: a session is "alive" iff its status is not offline.
    pub fn is_alive(&self) -> bool {
        !matches!(self.status, Status::Offline)
    }

    /// I2: internal sessions always carry a non-empty multiplexer session
    /// name; external sessions never do.
    pub fn terminal_invariant_holds(&self) -> bool {
        match self.kind {
            SessionKind::Internal => {
                self.terminal.multiplexer_session.as_deref().is_some_and(|s| !s.is_empty())
            }
            SessionKind::External => self.terminal.multiplexer_session.is_none(),
        }
    }

    pub fn basename_of(cwd: &str) -> String {
        std::path::Path::new(cwd)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| cwd.to_owned())
    }
}
