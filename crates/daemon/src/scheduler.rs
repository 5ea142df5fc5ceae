// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health and cleanup scheduler: five independent, idempotent,
//! exception-swallowing loops that keep session status honest and reclaim
//! sessions nobody is using anymore.

use std::sync::Arc;
use std::time::Duration;

use termexec::TerminalExecutor;
use tokio_util::sync::CancellationToken;

use crate::event::Event;
use crate::ingest::transcript::TranscriptWatcher;
use crate::session::registry::Registry;
use crate::session::{Session, SessionKind, Status};

pub const WORKING_TIMEOUT_MS: u64 = 2 * 60 * 1000;
pub const TRANSCRIPT_INACTIVE_MS: u64 = 30 * 60 * 1000;
pub const EXTERNAL_IDLE_MS: u64 = 5 * 60 * 1000;
pub const PHANTOM_CUTOFF_MS: u64 = 2 * 60 * 1000;
pub const ABSOLUTE_STALE_MS: u64 = 7 * 24 * 60 * 60 * 1000;
/// Open Question in the session catalog's cleanup rule: resolved to five
/// minutes, matching `EXTERNAL_IDLE_MS` — an offline external session is no
/// more worth keeping than an idle one nobody is probing.
pub const EXTERNAL_OFFLINE_CLEANUP_MS: u64 = 5 * 60 * 1000;
pub const OFFLINE_CLEANUP_MS: u64 = 60 * 60 * 1000;

fn spawn_tick(
    interval: Duration,
    cancel: CancellationToken,
    mut tick: impl FnMut() -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> + Send + 'static,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => tick().await,
            }
        }
    });
}

pub fn spawn_all(
    registry: Arc<Registry>,
    executor: Arc<TerminalExecutor>,
    transcripts: Arc<TranscriptWatcher>,
    cancel: CancellationToken,
) {
    spawn_tick(Duration::from_secs(5), cancel.clone(), {
        let registry = Arc::clone(&registry);
        let executor = Arc::clone(&executor);
        move || {
            let registry = Arc::clone(&registry);
            let executor = Arc::clone(&executor);
            Box::pin(async move { loop_a_tmux_liveness(&registry, &executor).await })
        }
    });

    spawn_tick(Duration::from_secs(10), cancel.clone(), {
        let registry = Arc::clone(&registry);
        move || {
            let registry = Arc::clone(&registry);
            Box::pin(async move { loop_b_working_timeout(&registry).await })
        }
    });

    spawn_tick(Duration::from_secs(30), cancel.clone(), {
        let registry = Arc::clone(&registry);
        let transcripts = Arc::clone(&transcripts);
        move || {
            let registry = Arc::clone(&registry);
            let transcripts = Arc::clone(&transcripts);
            Box::pin(async move { loop_c_transcript_staleness(&registry, &transcripts).await })
        }
    });

    spawn_tick(Duration::from_secs(60), cancel.clone(), {
        let registry = Arc::clone(&registry);
        let executor = Arc::clone(&executor);
        move || {
            let registry = Arc::clone(&registry);
            let executor = Arc::clone(&executor);
            Box::pin(async move { loop_d_external_staleness(&registry, &executor).await })
        }
    });

    spawn_tick(Duration::from_secs(60), cancel, {
        move || {
            let registry = Arc::clone(&registry);
            let executor = Arc::clone(&executor);
            Box::pin(async move { loop_e_cleanup(&registry, &executor).await })
        }
    });
}

async fn loop_a_tmux_liveness(registry: &Registry, executor: &TerminalExecutor) {
    let Ok(live) = executor.list_sessions().await else { return };
    let live_names: std::collections::HashSet<&str> = live.iter().map(|s| s.name.as_str()).collect();

    for session in registry.list().await {
        if session.kind != SessionKind::Internal {
            continue;
        }
        let Some(name) = session.terminal.multiplexer_session.as_deref() else { continue };
        let is_live = live_names.contains(name);
        if !is_live && session.status != Status::Offline {
            registry.force_status(&session.id, Status::Offline).await;
        } else if is_live && session.status == Status::Offline {
            registry.force_status(&session.id, Status::Idle).await;
        }
    }
}

async fn loop_b_working_timeout(registry: &Registry) {
    let now = Event::now_ms();
    for session in registry.list().await {
        if session.status == Status::Working && now.saturating_sub(session.last_activity) > WORKING_TIMEOUT_MS
        {
            registry.force_status(&session.id, Status::Idle).await;
        }
    }
}

async fn loop_c_transcript_staleness(registry: &Registry, transcripts: &TranscriptWatcher) {
    for session in registry.list().await {
        if session.kind != SessionKind::External || session.status == Status::Offline {
            continue;
        }
        let Some(thread_id) = session.agent_session_id.as_deref() else { continue };
        if !transcripts.is_session_active(thread_id, TRANSCRIPT_INACTIVE_MS).await {
            registry.force_status(&session.id, Status::Offline).await;
        }
    }
}

async fn loop_d_external_staleness(registry: &Registry, executor: &TerminalExecutor) {
    let now = Event::now_ms();
    for session in registry.list().await {
        if session.kind != SessionKind::External || session.status == Status::Offline {
            continue;
        }

        if let Some(pane_id) = session.terminal.pane_id.clone() {
            let alive = executor.pane_exists(&pane_id, session.terminal.socket.as_deref()).await.unwrap_or(true);
            if !alive {
                registry.force_status(&session.id, Status::Offline).await;
            }
            continue;
        }

        let bar = if session.status == Status::Working { WORKING_TIMEOUT_MS } else { EXTERNAL_IDLE_MS };
        if now.saturating_sub(session.last_activity) > bar {
            registry.force_status(&session.id, Status::Offline).await;
        }
    }
}

fn age(session: &Session, now: u64) -> u64 {
    now.saturating_sub(session.last_activity)
}

async fn loop_e_cleanup(registry: &Registry, executor: &TerminalExecutor) {
    let now = Event::now_ms();
    let live_names: std::collections::HashSet<String> =
        executor.list_sessions().await.map(|v| v.into_iter().map(|s| s.name).collect()).unwrap_or_default();

    for session in registry.list().await {
        if should_delete(&session, now, &live_names) {
            registry.remove(&session.id).await;
        }
    }
}

/// `DELETE /sessions/cleanup`: an on-demand bulk purge driven by caller
/// filters rather than the fixed loop-E rules. `max_age_ms` overrides the
/// rule thresholds with a single age bar; `phantom_only` narrows to R0.
pub async fn run_cleanup(
    registry: &Registry,
    executor: &TerminalExecutor,
    max_age_ms: Option<u64>,
    kind_filter: Option<SessionKind>,
    phantom_only: bool,
) -> usize {
    let now = Event::now_ms();
    let live_names: std::collections::HashSet<String> =
        executor.list_sessions().await.map(|v| v.into_iter().map(|s| s.name).collect()).unwrap_or_default();

    let mut removed = 0;
    for session in registry.list().await {
        if let Some(kind) = kind_filter {
            if session.kind != kind {
                continue;
            }
        }
        let matches = if phantom_only {
            session.kind == SessionKind::External && session.terminal.is_empty()
        } else if let Some(max_age) = max_age_ms {
            age(&session, now) >= max_age
        } else {
            should_delete(&session, now, &live_names)
        };
        if matches && registry.remove(&session.id).await.is_some() {
            removed += 1;
        }
    }
    removed
}

fn should_delete(session: &Session, now: u64, live_mux_names: &std::collections::HashSet<String>) -> bool {
    let idle_age = age(session, now);

    // R0: phantom external sessions with no terminal descriptor at all.
    if session.kind == SessionKind::External && session.terminal.is_empty() && idle_age >= PHANTOM_CUTOFF_MS {
        return true;
    }
    if session.status != Status::Offline {
        return false;
    }
    // R1: absolute stale, either kind.
    if idle_age >= ABSOLUTE_STALE_MS {
        return true;
    }
    // R2: external, offline long enough.
    if session.kind == SessionKind::External && idle_age >= EXTERNAL_OFFLINE_CLEANUP_MS {
        return true;
    }
    // R3: internal, offline, and its multiplexer session no longer exists.
    if session.kind == SessionKind::Internal && idle_age >= OFFLINE_CLEANUP_MS {
        let mux_gone = session
            .terminal
            .multiplexer_session
            .as_ref()
            .map_or(true, |name| !live_mux_names.contains(name));
        if mux_gone {
            return true;
        }
    }
    false
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
