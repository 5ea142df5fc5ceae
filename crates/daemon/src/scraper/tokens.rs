// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token counter scraper: reads scrollback every tick, extracts the latest
//! `"↓ N tokens"`/`"↓ N.Nk tokens"` marker, and accumulates a running total.
//! Only this scraper writes a session's `tokens` field (shared-resource
//! policy).

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::event::SessionTokenData;

/// `↓ 1234 tokens` or `↓ 12.3k tokens`, case sensitive on the down arrow the
/// agent actually emits.
#[allow(clippy::unwrap_used)]
static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"↓\s*([0-9]+(?:\.[0-9]+)?)(k)?\s*tokens").unwrap());

/// Scans `capture` for the token marker with the largest value and returns
/// it, or `None` if no marker is present.
pub fn extract_latest(capture: &str) -> Option<u64> {
    TOKEN_PATTERN
        .captures_iter(capture)
        .filter_map(|c| {
            let raw: f64 = c.get(1)?.as_str().parse().ok()?;
            let scaled = if c.get(2).is_some() { raw * 1000.0 } else { raw };
            Some(scaled.round() as u64)
        })
        .max()
}

/// Apply a freshly observed token count to accumulated state, per the
/// reset/cumulative rule: a higher reading extends the cumulative total; a
/// lower nonzero reading is a reset that only rebases `lastSeen`.
pub fn apply_reading(state: &mut SessionTokenData, new_value: u64, now_ms: u64) {
    if new_value > state.last_seen {
        state.cumulative += new_value - state.last_seen;
    }
    // A lower, nonzero reading means the agent reset its own counter; a zero
    // reading on a session that previously reported nothing is not a reset.
    state.last_seen = new_value;
    state.last_update = now_ms;
}

/// Skip-unchanged guard: a cheap hash of the capture's tail, so a scraper
/// tick over an unchanged pane does no regex work.
pub fn tail_digest(capture: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let tail_start = capture.len().saturating_sub(512);
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    capture[tail_start..].hash(&mut hasher);
    hasher.finish()
}

/// Per-session digest cache so the caller can skip sessions whose capture
/// hasn't changed since the last tick.
#[derive(Default)]
pub struct DigestCache {
    last: HashMap<String, u64>,
}

impl DigestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `capture`'s digest differs from what was last
    /// recorded for `session_id` (i.e. it is worth re-scanning).
    pub fn changed(&mut self, session_id: &str, capture: &str) -> bool {
        let digest = tail_digest(capture);
        let changed = self.last.get(session_id) != Some(&digest);
        self.last.insert(session_id.to_owned(), digest);
        changed
    }
}

#[cfg(test)]
#[path = "tokens_tests.rs"]
mod tests;
