// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The ingestion pipeline: raw lines in, normalized and deduplicated events
//! routed to the session registry.

pub mod log;
pub mod processor;
pub mod tailer;
pub mod transcript;

use crate::event::Event;
use crate::ingest::log::EventLog;
use crate::session::registry::Registry;

/// The single routing path shared by the Tailer's line stream and the
/// `/event` HTTP handlers: normalize, dedup-append, then route to a session
/// and apply to the state machine. A duplicate id (already appended by
/// another source, or a replayed tailer read of our own just-written line)
/// short-circuits before routing — this is what keeps the file tailer and
/// the HTTP push path from double-applying the same event.
pub async fn ingest_line(
    registry: &Registry,
    event_log: &EventLog,
    raw: &str,
    trace: bool,
    agent_override: Option<&str>,
) -> Option<Event> {
    let mut event = processor::process_line(raw, trace)?;
    if let Some(agent) = agent_override {
        if event.agent.is_empty() {
            event.agent = agent.to_owned();
        }
    }

    match event_log.append(&event).await {
        Ok(false) => return None,
        Ok(true) => {}
        Err(e) => tracing::warn!(err = %e, id = %event.id, "failed to persist event to the log"),
    }

    if event.agent_session_id.is_empty() || event.agent.is_empty() {
        tracing::debug!(id = %event.id, "event carries no routable agent/session identity, kept in history only");
        return Some(event);
    }

    // B1: an event older than the replay window must never cause session
    // creation; it is kept in history only, the same as an unroutable event.
    if registry.is_replay_only(event.timestamp) {
        tracing::debug!(id = %event.id, "event is outside the replay window, kept in history only");
        return Some(event);
    }

    let session_id =
        registry.find_or_create_session(&event.agent_session_id, &event.agent, &event.cwd, None).await;
    event.session_id = Some(session_id);
    registry.apply_event(&mut event).await;
    Some(event)
}

#[cfg(test)]
#[path = "ingest_tests.rs"]
mod tests;
