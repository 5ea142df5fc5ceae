// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic per-internal-session scrapers. Each runs on its own fixed-period
//! loop across all internal sessions; each session's iteration is
//! independent and exception-safe — a failure reading one pane never stops
//! the sweep over the others.

pub mod autoaccept;
pub mod permission;
pub mod suggestion;
pub mod tokens;

use std::sync::Arc;
use std::time::Duration;

use termexec::{Target, TerminalExecutor};
use tokio_util::sync::CancellationToken;

use crate::event::Event;
use crate::session::registry::Registry;
use crate::session::{SessionKind, Status};

const TOKEN_INTERVAL: Duration = Duration::from_millis(2000);
const PERMISSION_INTERVAL: Duration = Duration::from_millis(1000);
const SUGGESTION_INTERVAL: Duration = Duration::from_millis(1500);
const AUTOACCEPT_INTERVAL: Duration = Duration::from_millis(2000);

fn spawn_loop(
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

/// Spawn all four scraper loops. Returns immediately; loops run until
/// `cancel` fires.
pub fn spawn_all(registry: Arc<Registry>, executor: Arc<TerminalExecutor>, cancel: CancellationToken) {
    spawn_token_loop(Arc::clone(&registry), Arc::clone(&executor), cancel.clone());
    spawn_permission_loop(Arc::clone(&registry), Arc::clone(&executor), cancel.clone());
    spawn_suggestion_loop(Arc::clone(&registry), Arc::clone(&executor), cancel.clone());
    spawn_autoaccept_loop(registry, executor, cancel);
}

fn spawn_token_loop(registry: Arc<Registry>, executor: Arc<TerminalExecutor>, cancel: CancellationToken) {
    spawn_loop(TOKEN_INTERVAL, cancel, move || {
        let registry = Arc::clone(&registry);
        let executor = Arc::clone(&executor);
        Box::pin(async move {
            for session in registry.list().await {
                if session.kind != SessionKind::Internal {
                    continue;
                }
                let Some(name) = session.terminal.multiplexer_session.clone() else { continue };
                let target = Target::session(name);
                let Ok(capture) = executor.capture_pane(&target, Some(-200)).await else { continue };
                let Some(reading) = tokens::extract_latest(&capture) else { continue };
                let mut updated = session.tokens;
                tokens::apply_reading(&mut updated, reading, Event::now_ms());
                registry.set_tokens(&session.id, updated).await;
            }
        })
    });
}

fn spawn_permission_loop(registry: Arc<Registry>, executor: Arc<TerminalExecutor>, cancel: CancellationToken) {
    spawn_loop(PERMISSION_INTERVAL, cancel, move || {
        let registry = Arc::clone(&registry);
        let executor = Arc::clone(&executor);
        Box::pin(async move {
            for session in registry.list().await {
                if session.kind != SessionKind::Internal {
                    continue;
                }
                let Some(name) = session.terminal.multiplexer_session.clone() else { continue };
                let target = Target::session(name.clone());
                let Ok(capture) = executor.capture_pane(&target, Some(-200)).await else { continue };

                if !session.bypass_warning_handled && permission::detect_bypass_warning(&capture) {
                    let _ = executor.send_keys(&target, &[permission::BYPASS_ACK_KEY]).await;
                    registry.mark_bypass_warning_handled(&session.id).await;
                }

                match (permission::detect(&capture), session.pending_permission.is_some()) {
                    (Some(pending), _) => {
                        registry.mark_waiting_on_permission(&session.id, pending.tool.clone(), pending).await;
                    }
                    (None, true) => {
                        registry.clear_permission(&session.id).await;
                    }
                    (None, false) => {}
                }
            }
        })
    });
}

fn spawn_suggestion_loop(registry: Arc<Registry>, executor: Arc<TerminalExecutor>, cancel: CancellationToken) {
    spawn_loop(SUGGESTION_INTERVAL, cancel, move || {
        let registry = Arc::clone(&registry);
        let executor = Arc::clone(&executor);
        Box::pin(async move {
            for session in registry.list().await {
                if session.kind != SessionKind::Internal
                    || !matches!(session.status, Status::Waiting | Status::Idle)
                {
                    continue;
                }
                let Some(name) = session.terminal.multiplexer_session.clone() else { continue };
                let target = Target::session(name);
                let Ok(capture) = executor.capture_pane(&target, Some(-20)).await else { continue };
                let extracted = suggestion::extract(&capture);
                if extracted != session.suggestion {
                    registry.set_suggestion(&session.id, extracted).await;
                }
            }
        })
    });
}

fn spawn_autoaccept_loop(registry: Arc<Registry>, executor: Arc<TerminalExecutor>, cancel: CancellationToken) {
    let cooldowns = Arc::new(tokio::sync::Mutex::new(autoaccept::CooldownTracker::new()));
    spawn_loop(AUTOACCEPT_INTERVAL, cancel, move || {
        let registry = Arc::clone(&registry);
        let executor = Arc::clone(&executor);
        let cooldowns = Arc::clone(&cooldowns);
        Box::pin(async move {
            for session in registry.list().await {
                if !autoaccept::eligible(&session) {
                    continue;
                }
                if !cooldowns.lock().await.try_fire(&session.id, Event::now_ms()) {
                    continue;
                }
                let Some(name) = session.terminal.multiplexer_session.clone() else { continue };
                let Some(suggestion) = session.suggestion.clone() else { continue };
                let target = Target::session(name);
                if executor.paste(&target, &suggestion, true).await.is_ok() {
                    registry.set_suggestion(&session.id, None).await;
                    registry.force_status(&session.id, Status::Working).await;
                }
            }
        })
    });
}
