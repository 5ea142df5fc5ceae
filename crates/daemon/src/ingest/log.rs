// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The append-only JSONL event log. Every normalized event that reaches the
//! registry is appended here first; `event.id` is deduplicated against a
//! bounded, FIFO-trimmed window so a tailer replay or a retried push doesn't
//! double-apply.

use std::collections::{HashSet, VecDeque};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;

use crate::event::Event;

pub struct EventLog {
    path: PathBuf,
    max_events: usize,
    seen: Mutex<SeenIds>,
    count: AtomicU64,
}

struct SeenIds {
    order: VecDeque<String>,
    set: HashSet<String>,
}

impl SeenIds {
    fn new() -> Self {
        Self { order: VecDeque::new(), set: HashSet::new() }
    }

    /// Returns `true` if `id` was newly inserted (i.e. not a duplicate).
    fn insert(&mut self, id: &str, cap: usize) -> bool {
        if !self.set.insert(id.to_owned()) {
            return false;
        }
        self.order.push_back(id.to_owned());
        while self.order.len() > cap {
            if let Some(oldest) = self.order.pop_front() {
                self.set.remove(&oldest);
            }
        }
        true
    }
}

impl EventLog {
    pub fn new(path: PathBuf, max_events: usize) -> Self {
        Self { path, max_events, seen: Mutex::new(SeenIds::new()), count: AtomicU64::new(0) }
    }

    /// Replay the log at startup, returning every historical line in file
    /// order. The caller is responsible for applying the replay-window rule;
    /// this just reads lines and seeds the dedup window.
    pub async fn load_history(&self) -> Vec<Event> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(err = %e, path = %self.path.display(), "failed to read event log");
                return Vec::new();
            }
        };

        let mut events = Vec::new();
        let mut seen = self.seen.lock().await;
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Event>(line) {
                Ok(event) => {
                    if seen.insert(&event.id, self.max_events) {
                        events.push(event);
                    }
                }
                Err(e) => {
                    tracing::warn!(err = %e, "skipping malformed event log line");
                }
            }
        }
        self.count.store(events.len() as u64, Ordering::Relaxed);
        events
    }

    /// Append one event if its id hasn't been seen. Returns `false` if it was
    /// a duplicate (the caller should skip routing it further).
    pub async fn append(&self, event: &Event) -> anyhow::Result<bool> {
        let mut seen = self.seen.lock().await;
        if !seen.insert(&event.id, self.max_events) {
            return Ok(false);
        }
        drop(seen);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let line = serde_json::to_string(event)?;
        writeln!(file, "{line}")?;
        self.count.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }

    /// Number of events recorded since process start (approximate: reflects
    /// appends and the startup replay, not FIFO trimming of the dedup set).
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Re-read the log fresh (ignoring dedup state) and return the last
    /// `limit` events, optionally filtered to a set of session ids.
    pub async fn recent(&self, limit: usize, session_filter: Option<&HashSet<String>>) -> Vec<Event> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };
        let mut events: Vec<Event> = contents
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str::<Event>(l).ok())
            .filter(|e| match (&e.session_id, session_filter) {
                (Some(id), Some(filter)) => filter.contains(id),
                (None, Some(_)) => false,
                (_, None) => true,
            })
            .collect();
        let start = events.len().saturating_sub(limit);
        events.split_off(start)
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
