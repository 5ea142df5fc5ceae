// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Surfaces events from agents whose integration point is a transcript file
//! on disk rather than a hook call. Parses newly appended records, stamps
//! them with the file's thread id, and appends them to the same event log
//! the tailer writes to — the tailer is the single unified ingestion path
//! downstream of this watcher.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use crate::event::{Event, EventKind};
use crate::ingest::log::EventLog;
use crate::ingest::processor;

const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Announced once per transcript file the first time it is observed.
#[derive(Debug, Clone)]
pub struct SessionNew {
    pub thread_id: String,
    pub cwd: String,
    pub display_name: String,
}

pub struct TranscriptWatcher {
    agent: String,
    root: PathBuf,
    cursors: RwLock<HashMap<PathBuf, u64>>,
    known: RwLock<HashSet<PathBuf>>,
    last_seen: RwLock<HashMap<String, u64>>,
}

impl TranscriptWatcher {
    pub fn new(agent: impl Into<String>, root: PathBuf) -> Self {
        Self {
            agent: agent.into(),
            root,
            cursors: RwLock::new(HashMap::new()),
            known: RwLock::new(HashSet::new()),
            last_seen: RwLock::new(HashMap::new()),
        }
    }

    pub async fn is_session_active(&self, thread_id: &str, within_ms: u64) -> bool {
        match self.last_seen.read().await.get(thread_id) {
            Some(&t) => Event::now_ms().saturating_sub(t) <= within_ms,
            None => false,
        }
    }

    /// Force an immediate rescan. The watcher covers the whole directory
    /// tree per scan, so no per-thread filtering is needed here.
    pub async fn trigger_check_for_thread(&self, event_log: &EventLog) -> Vec<SessionNew> {
        self.scan_once(event_log).await
    }

    pub fn spawn(
        self: std::sync::Arc<Self>,
        event_log: std::sync::Arc<EventLog>,
        cancel: CancellationToken,
    ) -> mpsc::UnboundedReceiver<SessionNew> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut poll = tokio::time::interval(POLL_INTERVAL);
            poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = poll.tick() => {
                        for announcement in self.scan_once(&event_log).await {
                            let _ = tx.send(announcement);
                        }
                    }
                }
            }
        });
        rx
    }

    async fn scan_once(&self, event_log: &EventLog) -> Vec<SessionNew> {
        let files = match walk_transcript_files(&self.root) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(err = %e, root = %self.root.display(), "transcript directory scan failed");
                return Vec::new();
            }
        };

        let mut announcements = Vec::new();
        for file in files {
            let thread_id = thread_id_for(&file);

            let is_new = {
                let mut known = self.known.write().await;
                known.insert(file.clone())
            };

            let cursor = {
                let cursors = self.cursors.read().await;
                cursors.get(&file).copied().unwrap_or(0)
            };

            let (lines, new_cursor) = match read_new_lines(&file, cursor) {
                Some(result) => result,
                None => continue,
            };
            self.cursors.write().await.insert(file.clone(), new_cursor);

            if lines.is_empty() && !is_new {
                continue;
            }

            let cwd = parent_dir_string(&file);
            if is_new {
                announcements.push(SessionNew {
                    thread_id: thread_id.clone(),
                    cwd: cwd.clone(),
                    display_name: thread_id.clone(),
                });
            }

            for line in lines {
                let mut event = processor::process_line(&line, false).unwrap_or_else(|| Event {
                    id: uuid::Uuid::new_v4().to_string(),
                    timestamp: Event::now_ms(),
                    kind: EventKind::Notification,
                    session_id: None,
                    cwd: cwd.clone(),
                    tool: None,
                    tool_input: None,
                    tool_response: None,
                    tool_use_id: None,
                    assistant_text: None,
                    response: None,
                    duration: None,
                    agent_session_id: thread_id.clone(),
                    agent: self.agent.clone(),
                });
                if event.agent_session_id.is_empty() {
                    event.agent_session_id = thread_id.clone();
                }
                if event.cwd.is_empty() {
                    event.cwd = cwd.clone();
                }
                if event.agent.is_empty() {
                    event.agent = self.agent.clone();
                }
                self.last_seen.write().await.insert(thread_id.clone(), Event::now_ms());
                if let Err(e) = event_log.append(&event).await {
                    tracing::warn!(err = %e, "failed to append transcript-derived event");
                }
            }
        }
        announcements
    }
}

fn thread_id_for(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| path.display().to_string())
}

fn parent_dir_string(path: &Path) -> String {
    path.parent().map(|p| p.display().to_string()).unwrap_or_default()
}

fn walk_transcript_files(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    if !root.exists() {
        return Ok(out);
    }
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().is_some_and(|ext| ext == "jsonl") {
                out.push(path);
            }
        }
    }
    out.sort();
    Ok(out)
}

fn read_new_lines(path: &Path, cursor: u64) -> Option<(Vec<String>, u64)> {
    use std::io::{Read, Seek, SeekFrom};

    let mut file = std::fs::File::open(path).ok()?;
    let len = file.metadata().ok()?.len();
    if len < cursor {
        return read_new_lines(path, 0);
    }
    if len == cursor {
        return Some((Vec::new(), cursor));
    }
    file.seek(SeekFrom::Start(cursor)).ok()?;
    let mut buf = String::new();
    file.read_to_string(&mut buf).ok()?;
    let lines = buf.lines().filter(|l| !l.trim().is_empty()).map(str::to_owned).collect();
    Some((lines, len))
}

#[cfg(test)]
#[path = "transcript_tests.rs"]
mod tests;
