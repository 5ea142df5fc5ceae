// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The command layer: the public operations the HTTP/WS surface translates
//! requests into. Every command either mutates the registry directly or
//! drives a [`TerminalExecutor`] call first and only mutates the registry on
//! success — the registry is never left describing a multiplexer session
//! that does not exist.

use std::sync::Arc;

use termexec::{Target, TerminalExecutor};

use crate::error::ApiError;
use crate::session::adapter::{ImageAttachment, LaunchFlags};
use crate::session::registry::Registry;
use crate::session::{Session, SessionKind, Status, TerminalDescriptor};

/// Inputs to `create session (internal)`.
#[derive(Debug, Clone, Default)]
pub struct CreateSessionRequest {
    pub name: Option<String>,
    pub cwd: String,
    pub agent: String,
    pub continue_session: bool,
    pub skip_permissions: bool,
    pub open_terminal: bool,
    pub extras: Vec<String>,
    pub zone_position: Option<serde_json::Value>,
}

fn short_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_owned()
}

/// Create an internal session: validate cwd, allocate an id and a fresh
/// multiplexer session name, spawn it, inject the adapter's launch line, and
/// only then record the session. A failure at either terminal step kills the
/// partial multiplexer session rather than leaving it orphaned.
pub async fn create_session(
    registry: &Registry,
    executor: &TerminalExecutor,
    req: CreateSessionRequest,
) -> Result<Session, ApiError> {
    termexec::validate::cwd(&req.cwd).map_err(|e| ApiError::validation(e.to_string()))?;
    let adapter = registry
        .adapters
        .get(&req.agent)
        .ok_or_else(|| ApiError::validation(format!("unknown agent: {}", req.agent)))?;

    let id = registry.next_id();
    let mux_name = format!("{}-{}", registry.tmux_session_prefix(), short_id());

    executor.create_detached(&mux_name, &req.cwd).await.map_err(|e| ApiError::external(e.to_string()))?;

    let flags = LaunchFlags {
        continue_session: req.continue_session,
        skip_permissions: req.skip_permissions || default_skip_permissions(),
        extras: req.extras.clone(),
    };
    let argv = adapter.launch_command(&flags, &req.cwd);
    let command_line = shell_words_join(&argv);

    if let Err(e) = executor.inject_command(&mux_name, &command_line).await {
        let _ = executor.kill(&mux_name).await;
        return Err(ApiError::external(e.to_string()));
    }

    let now = crate::event::Event::now_ms();
    let session = Session {
        id,
        name: req.name.unwrap_or_else(|| Session::basename_of(&req.cwd)),
        kind: SessionKind::Internal,
        agent: req.agent,
        status: Status::Idle,
        terminal: TerminalDescriptor { multiplexer_session: Some(mux_name), ..Default::default() },
        cwd: req.cwd,
        agent_session_id: None,
        current_tool: None,
        zone_position: req.zone_position,
        suggestion: None,
        auto_accept: false,
        created_at: now,
        last_activity: now,
        git_status: None,
        image_quota: None,
        pending_permission: None,
        tokens: Default::default(),
        bypass_warning_handled: false,
    };
    registry.insert_internal(session.clone()).await;
    registry.persist_metadata_for(&session.id).await;

    // Step 8 (best-effort, platform-gated UI-shell attach) has no terminal
    // counterpart in this build: there is no platform windowing layer to ask.
    Ok(session)
}

fn default_skip_permissions() -> bool {
    true
}

/// Join argv into a single command line for `send-keys`, quoting any token
/// that contains whitespace or shell-significant characters.
fn shell_words_join(argv: &[String]) -> String {
    argv.iter()
        .map(|tok| {
            if tok.is_empty() || tok.chars().any(|c| c.is_whitespace() || "\"'$`\\".contains(c)) {
                format!("'{}'", tok.replace('\'', "'\\''"))
            } else {
                tok.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn target_for(session: &Session) -> Option<Target> {
    match session.kind {
        SessionKind::Internal => {
            session.terminal.multiplexer_session.clone().map(Target::session)
        }
        SessionKind::External => {
            session.terminal.pane_id.clone().map(|p| Target::pane(p, session.terminal.socket.clone()))
        }
    }
}

/// Send a prompt into a session's terminal. Internal sessions are pasted
/// into their owned multiplexer session; external sessions require a
/// recorded pane.
pub async fn send_prompt(
    registry: &Registry,
    executor: &TerminalExecutor,
    session_id: &str,
    prompt: &str,
    attachments: &[ImageAttachment],
) -> Result<(), ApiError> {
    let session = registry.get(session_id).await.ok_or_else(|| ApiError::not_found("session not found"))?;
    let target = target_for(&session)
        .ok_or_else(|| ApiError::conflict("cannot send: session has no terminal target"))?;

    let text = match registry.adapters.get(&session.agent) {
        Some(adapter) => adapter.preprocess_prompt(prompt, attachments),
        None => prompt.to_owned(),
    };

    executor.paste(&target, &text, true).await.map_err(|e| ApiError::external(e.to_string()))?;
    registry.touch_activity(session_id).await;
    Ok(())
}

/// Send Ctrl-C to an internal session; external sessions cannot be cancelled.
pub async fn cancel(
    registry: &Registry,
    executor: &TerminalExecutor,
    session_id: &str,
) -> Result<(), ApiError> {
    let session = registry.get(session_id).await.ok_or_else(|| ApiError::not_found("session not found"))?;
    if session.kind != SessionKind::Internal {
        return Err(ApiError::conflict("cancel is only valid for internal sessions"));
    }
    let Some(name) = session.terminal.multiplexer_session.clone() else {
        return Err(ApiError::conflict("session has no multiplexer session"));
    };
    let target = Target::session(name);
    executor.send_keys(&target, &["C-c"]).await.map_err(|e| ApiError::external(e.to_string()))?;
    registry.touch_activity(session_id).await;
    Ok(())
}

/// Restart an internal session: kill its multiplexer session if present,
/// recreate it, inject the adapter's restart command, and clear the
/// agent-session binding. Stale index entries pointing to this session are
/// removed by the registry.
pub async fn restart(
    registry: &Registry,
    executor: &TerminalExecutor,
    session_id: &str,
) -> Result<(), ApiError> {
    let session = registry.get(session_id).await.ok_or_else(|| ApiError::not_found("session not found"))?;
    if session.kind != SessionKind::Internal {
        return Err(ApiError::conflict("restart is only valid for internal sessions"));
    }
    let Some(name) = session.terminal.multiplexer_session.clone() else {
        return Err(ApiError::conflict("session has no multiplexer session"));
    };

    let _ = executor.kill(&name).await;
    executor.create_detached(&name, &session.cwd).await.map_err(|e| ApiError::external(e.to_string()))?;

    let adapter = registry
        .adapters
        .get(&session.agent)
        .ok_or_else(|| ApiError::internal("adapter disappeared for session's agent"))?;
    let argv = adapter.restart_command(&session.cwd);
    let command_line = shell_words_join(&argv);
    executor.inject_command(&name, &command_line).await.map_err(|e| ApiError::external(e.to_string()))?;

    registry.reset_for_restart(session_id).await;
    Ok(())
}

/// Respond to a pending permission prompt by number.
pub async fn permission_response(
    registry: &Registry,
    executor: &TerminalExecutor,
    session_id: &str,
    option_number: u32,
) -> Result<(), ApiError> {
    let session = registry.get(session_id).await.ok_or_else(|| ApiError::not_found("session not found"))?;
    let pending = session
        .pending_permission
        .as_ref()
        .ok_or_else(|| ApiError::conflict("no pending permission for this session"))?;
    if !pending.options.iter().any(|o| o.number == option_number) {
        return Err(ApiError::validation("not a valid option number"));
    }
    let Some(name) = session.terminal.multiplexer_session.clone() else {
        return Err(ApiError::conflict("session has no multiplexer session"));
    };
    let target = Target::session(name);
    let key = option_number.to_string();
    executor.send_keys(&target, &[key.as_str()]).await.map_err(|e| ApiError::external(e.to_string()))?;
    registry.clear_permission(session_id).await;
    registry.force_status(session_id, Status::Working).await;
    Ok(())
}

/// Delete a session: kills its multiplexer session (internal) via the
/// registry removal path, best-effort.
pub async fn delete_session(
    registry: &Registry,
    executor: &TerminalExecutor,
    session_id: &str,
) -> Result<(), ApiError> {
    let Some(session) = registry.remove(session_id).await else {
        return Err(ApiError::not_found("session not found"));
    };
    if let Some(name) = session.terminal.multiplexer_session {
        if let Err(e) = executor.kill(&name).await {
            tracing::warn!(err = %e, session = %session_id, "failed to kill multiplexer session on delete");
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
