// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Auto-accept loop: for internal sessions with `autoAccept` set, a pending
//! suggestion, and a status of waiting or idle, resubmits the suggestion as
//! a prompt and clears it. Rate-limited per session so a flapping status
//! doesn't resend the same prompt repeatedly.

use std::collections::HashMap;
use std::time::Duration;

use crate::session::{Session, SessionKind, Status};

pub const COOLDOWN: Duration = Duration::from_secs(3);

pub fn eligible(session: &Session) -> bool {
    session.kind == SessionKind::Internal
        && session.auto_accept
        && matches!(session.status, Status::Waiting | Status::Idle)
        && session.suggestion.as_deref().is_some_and(|s| !s.is_empty())
}

/// Tracks the last time each session was auto-accepted, so the loop can
/// enforce the cooldown independent of its own tick rate.
#[derive(Default)]
pub struct CooldownTracker {
    last_fired_ms: HashMap<String, u64>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `session_id` is past its cooldown and may fire
    /// again, recording `now_ms` as its new last-fired time if so.
    pub fn try_fire(&mut self, session_id: &str, now_ms: u64) -> bool {
        let cooldown_ms = COOLDOWN.as_millis() as u64;
        let ready = match self.last_fired_ms.get(session_id) {
            Some(&last) => now_ms.saturating_sub(last) >= cooldown_ms,
            None => true,
        };
        if ready {
            self.last_fired_ms.insert(session_id.to_owned(), now_ms);
        }
        ready
    }
}

#[cfg(test)]
#[path = "autoaccept_tests.rs"]
mod tests;
