// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The session registry: the typed store of sessions, its identity indices,
//! the lifecycle state machine, and persistence.
//!
//! Single owner of session state (no module-level singletons): a `Registry`
//! is constructed once at startup and handed out as an `Arc`. All mutation
//! methods take the internal write lock for their whole body, which is the
//! serialization point the concurrency model calls the "ingestion worker or
//! registry lock" — callers never see a torn update.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::Config;
use crate::event::{Event, EventKind};
use crate::push::PushHub;
use crate::session::adapter::AdapterTable;
use crate::session::persistence::{self, CoreStore, MetadataEntry};
use crate::session::{Session, SessionKind, Status, TerminalDescriptor};

/// Sessions whose age exceeds this, measured from process start, are kept in
/// history for display only and must never trigger create-or-update.
pub const REPLAY_WINDOW_MS: u64 = 30 * 60 * 1000;

struct Indices {
    /// `"{agent}:{agentSessionId}" -> sessionId`.
    agent_index: HashMap<String, String>,
    /// `multiplexerSessionName -> sessionId`, internal sessions only.
    mux_index: HashMap<String, String>,
}

pub struct Registry {
    sessions: RwLock<HashMap<String, Session>>,
    indices: RwLock<Indices>,
    counter: AtomicU64,
    config: Arc<Config>,
    push: Arc<PushHub>,
    pub adapters: Arc<AdapterTable>,
    /// Timestamp the registry was constructed; used to gate replay-window
    /// checks for events loaded from the event log at startup.
    started_at_ms: u64,
    /// P3 correlation map: `"{sessionId}:{toolUseId}" -> pre.timestamp`,
    /// consumed by the matching `post_tool_use` to compute `duration`.
    pending_tool_use: RwLock<HashMap<String, u64>>,
}

fn tool_use_key(session_id: &str, tool_use_id: &str) -> String {
    format!("{session_id}:{tool_use_id}")
}

fn agent_key(agent: &str, agent_session_id: &str) -> String {
    format!("{agent}:{agent_session_id}")
}

impl Registry {
    pub fn load(config: Arc<Config>, adapters: Arc<AdapterTable>, push: Arc<PushHub>) -> Self {
        let core = persistence::load_core(&config.sessions_path());
        let metadata = persistence::load_metadata(&config.metadata_path());

        let mut sessions = HashMap::new();
        let mut agent_index = HashMap::new();
        let mut mux_index = HashMap::new();

        for mut session in core.sessions {
            persistence::merge_metadata(&mut session, metadata.get(&session.id));
            if let Some(ref agent_sid) = session.agent_session_id {
                agent_index.insert(agent_key(&session.agent, agent_sid), session.id.clone());
            }
            if session.kind == SessionKind::Internal {
                if let Some(ref name) = session.terminal.multiplexer_session {
                    mux_index.insert(name.clone(), session.id.clone());
                }
            }
            sessions.insert(session.id.clone(), session);
        }

        Self {
            sessions: RwLock::new(sessions),
            indices: RwLock::new(Indices { agent_index, mux_index }),
            counter: AtomicU64::new(core.counter),
            config,
            push,
            adapters,
            started_at_ms: Event::now_ms(),
            pending_tool_use: RwLock::new(HashMap::new()),
        }
    }

    pub fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("s{n:x}")
    }

    pub async fn get(&self, id: &str) -> Option<Session> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn list(&self) -> Vec<Session> {
        self.sessions.read().await.values().cloned().collect()
    }

    pub async fn session_id_for_mux_name(&self, name: &str) -> Option<String> {
        self.indices.read().await.mux_index.get(name).cloned()
    }

    pub fn tmux_session_prefix(&self) -> &str {
        &self.config.tmux_session_prefix
    }

    /// B1: an event older than the replay window contributes to history
    /// only — it must never cause session creation or a state transition.
    pub fn is_replay_only(&self, timestamp: u64) -> bool {
        self.started_at_ms.saturating_sub(timestamp) > REPLAY_WINDOW_MS && timestamp < self.started_at_ms
    }

    /// Persist core state. Best-effort: logged, never fatal (I7).
    fn persist_core_locked(&self, sessions: &HashMap<String, Session>) {
        let store = CoreStore {
            sessions: sessions.values().cloned().collect(),
            agent_index: HashMap::new(), // rebuilt from sessions on load
            counter: self.counter.load(Ordering::Relaxed),
        };
        if let Err(e) = persistence::save_core(&self.config.sessions_path(), &store) {
            tracing::warn!(err = %e, "failed to persist session core store");
        }
    }

    pub async fn persist_metadata_for(&self, id: &str) {
        let sessions = self.sessions.read().await;
        let Some(session) = sessions.get(id) else { return };
        let mut metadata = persistence::load_metadata(&self.config.metadata_path());
        metadata.insert(
            id.to_owned(),
            MetadataEntry {
                zone_position: session.zone_position.clone(),
                suggestion: session.suggestion.clone(),
                auto_accept: session.auto_accept,
            },
        );
        drop(sessions);
        if let Err(e) = persistence::save_metadata(&self.config.metadata_path(), &metadata) {
            tracing::warn!(err = %e, "failed to persist session metadata store");
        }
    }

    /// Registration and linking per the registry's `findOrCreateSession`
    /// contract: direct hit, cwd adoption, then auto-create. Auto-creation is
    /// the only source of external sessions.
    pub async fn find_or_create_session(
        &self,
        agent_session_id: &str,
        agent: &str,
        cwd: &str,
        terminal_hint: Option<TerminalDescriptor>,
    ) -> String {
        let mut sessions = self.sessions.write().await;
        let mut indices = self.indices.write().await;

        // 1. Direct hit on the agent index.
        if let Some(id) = indices.agent_index.get(&agent_key(agent, agent_session_id)) {
            let id = id.clone();
            if let Some(session) = sessions.get_mut(&id) {
                if session.kind == SessionKind::External {
                    if let Some(hint) = terminal_hint {
                        session.terminal = hint;
                    }
                }
                return id;
            }
        }

        // 2. Adopt an internal session with matching cwd and no agent link.
        if let Some((id, session)) = sessions.iter_mut().find(|(_, s)| {
            s.kind == SessionKind::Internal && s.cwd == cwd && s.agent_session_id.is_none()
        }) {
            session.agent_session_id = Some(agent_session_id.to_owned());
            indices.agent_index.insert(agent_key(agent, agent_session_id), id.clone());
            return id.clone();
        }

        // 3. Auto-create an external session.
        let id = self.next_id();
        let now = Event::now_ms();
        let session = Session {
            id: id.clone(),
            name: Session::basename_of(cwd),
            kind: SessionKind::External,
            agent: agent.to_owned(),
            status: Status::Working,
            terminal: terminal_hint.unwrap_or_default(),
            cwd: cwd.to_owned(),
            agent_session_id: Some(agent_session_id.to_owned()),
            current_tool: None,
            zone_position: None,
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
        indices.agent_index.insert(agent_key(agent, agent_session_id), id.clone());
        sessions.insert(id.clone(), session.clone());
        self.persist_core_locked(&sessions);
        drop(indices);
        drop(sessions);
        self.push.broadcast_session_created(&session).await;
        id
    }

    /// Apply a normalized, already-routed event to the state machine.
    ///
    /// For a matched `pre_tool_use`/`post_tool_use` pair (P3), stamps
    /// `event.duration` in place so the caller's broadcast copy carries it.
    pub async fn apply_event(&self, event: &mut Event) -> Option<()> {
        let id = event.session_id.clone()?;

        // B1: events older than the replay window are history-only.
        if self.is_replay_only(event.timestamp) {
            return None;
        }

        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id)?;
        let now = Event::now_ms();

        match event.kind {
            EventKind::PreToolUse => {
                session.status = Status::Working;
                session.current_tool = event.tool.clone();
                session.last_activity = now;
                if let Some(ref tool_use_id) = event.tool_use_id {
                    self.pending_tool_use.write().await.insert(tool_use_key(&id, tool_use_id), event.timestamp);
                }
            }
            EventKind::PostToolUse => {
                session.current_tool = None;
                session.last_activity = now;
                if let Some(ref tool_use_id) = event.tool_use_id {
                    let pre_ts = self.pending_tool_use.write().await.remove(&tool_use_key(&id, tool_use_id));
                    if let Some(pre_ts) = pre_ts {
                        event.duration = Some(event.timestamp.saturating_sub(pre_ts));
                    }
                }
            }
            EventKind::UserPromptSubmit => {
                session.status = Status::Working;
                session.current_tool = None;
                session.last_activity = now;
            }
            EventKind::Stop | EventKind::SubagentStop => {
                session.status = Status::Waiting;
                session.current_tool = None;
                session.last_activity = now;
            }
            EventKind::SessionEnd => {
                session.status = Status::Idle;
                session.current_tool = None;
                session.last_activity = now;
            }
            EventKind::SessionStart | EventKind::Notification => {
                session.last_activity = now;
            }
        }

        self.persist_core_locked(&sessions);
        let snapshot = session.clone();
        drop(sessions);
        self.push.broadcast_event_and_session(event, &snapshot).await;
        Some(())
    }

    /// `scraper: permission detected` transition (4.7).
    pub async fn mark_waiting_on_permission(
        &self,
        id: &str,
        tool: Option<String>,
        pending: crate::event::PendingPermission,
    ) {
        let snapshot = self
            .mutate_and_broadcast(id, |s| {
                s.status = Status::Waiting;
                s.current_tool = tool;
                s.pending_permission = Some(pending);
            })
            .await;
        if let Some(session) = snapshot {
            if let Some(ref pending) = session.pending_permission {
                self.push.broadcast_permission_prompt(id, pending).await;
            }
        }
    }

    /// `scraper: permission cleared` transition: only promotes to working if
    /// the session was waiting because of this permission.
    pub async fn clear_permission(&self, id: &str) {
        let had_pending = self.sessions.read().await.get(id).is_some_and(|s| s.pending_permission.is_some());
        self.mutate_and_broadcast(id, |s| {
            if s.pending_permission.is_some() {
                s.pending_permission = None;
                if s.status == Status::Waiting {
                    s.status = Status::Working;
                    s.current_tool = None;
                }
            }
        })
        .await;
        if had_pending {
            self.push.broadcast_permission_resolved(id).await;
        }
    }

    /// `scheduler: working timeout` and `scheduler: offline rules hit` share
    /// this shape: set a terminal status for the tick, without bumping
    /// lastActivity (offline transitions age off the last known activity).
    pub async fn force_status(&self, id: &str, status: Status) {
        self.mutate_and_broadcast_no_touch(id, |s| {
            s.status = status;
            s.current_tool = None;
        })
        .await;
    }

    pub async fn set_suggestion(&self, id: &str, suggestion: Option<String>) {
        self.mutate_and_broadcast_no_touch(id, |s| s.suggestion = suggestion).await;
    }

    pub async fn mark_bypass_warning_handled(&self, id: &str) {
        self.mutate_and_broadcast_no_touch(id, |s| s.bypass_warning_handled = true).await;
    }

    pub async fn set_tokens(&self, id: &str, tokens: crate::event::SessionTokenData) {
        self.mutate_and_broadcast_no_touch(id, |s| s.tokens = tokens).await;
    }

    pub async fn touch_activity(&self, id: &str) {
        let now = Event::now_ms();
        self.mutate_and_broadcast_no_touch(id, |s| s.last_activity = now).await;
    }

    /// `command: restart (internal)`: clears the agent-session binding and
    /// current tool, resets to idle. Stale index entries for this session
    /// are removed.
    pub async fn reset_for_restart(&self, id: &str) {
        let mut sessions = self.sessions.write().await;
        let mut indices = self.indices.write().await;
        let Some(session) = sessions.get_mut(id) else { return };
        if let Some(agent_sid) = session.agent_session_id.take() {
            indices.agent_index.remove(&agent_key(&session.agent, &agent_sid));
        }
        session.current_tool = None;
        session.status = Status::Idle;
        let snapshot = session.clone();
        self.persist_core_locked(&sessions);
        drop(indices);
        drop(sessions);
        self.push.broadcast_session_updated(&snapshot).await;
    }

    pub async fn insert_internal(&self, session: Session) {
        let mut sessions = self.sessions.write().await;
        let mut indices = self.indices.write().await;
        if let Some(ref name) = session.terminal.multiplexer_session {
            indices.mux_index.insert(name.clone(), session.id.clone());
        }
        sessions.insert(session.id.clone(), session.clone());
        self.persist_core_locked(&sessions);
        drop(indices);
        drop(sessions);
        self.push.broadcast_session_created(&session).await;
    }

    pub async fn remove(&self, id: &str) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        let mut indices = self.indices.write().await;
        let removed = sessions.remove(id)?;
        if let Some(ref agent_sid) = removed.agent_session_id {
            indices.agent_index.remove(&agent_key(&removed.agent, agent_sid));
        }
        if let Some(ref name) = removed.terminal.multiplexer_session {
            indices.mux_index.remove(name);
        }
        self.persist_core_locked(&sessions);
        drop(indices);
        drop(sessions);
        self.push.broadcast_session_removed(&removed.id).await;
        Some(removed)
    }

    pub async fn update_fields(
        &self,
        id: &str,
        name: Option<String>,
        zone_position: Option<Option<serde_json::Value>>,
        auto_accept: Option<bool>,
    ) -> Option<Session> {
        let snapshot = self
            .mutate_and_broadcast_no_touch(id, move |s| {
                if let Some(ref name) = name {
                    s.name = name.clone();
                }
                if let Some(ref zp) = zone_position {
                    s.zone_position = zp.clone();
                }
                if let Some(aa) = auto_accept {
                    s.auto_accept = aa;
                }
            })
            .await;
        if snapshot.is_some() {
            self.persist_metadata_for(id).await;
        }
        snapshot
    }

    async fn mutate_and_broadcast(
        &self,
        id: &str,
        f: impl FnOnce(&mut Session),
    ) -> Option<Session> {
        self.mutate_and_broadcast_no_touch(id, f).await
    }

    async fn mutate_and_broadcast_no_touch(
        &self,
        id: &str,
        f: impl FnOnce(&mut Session),
    ) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id)?;
        f(session);
        let snapshot = session.clone();
        self.persist_core_locked(&sessions);
        drop(sessions);
        self.push.broadcast_session_updated(&snapshot).await;
        Some(snapshot)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
