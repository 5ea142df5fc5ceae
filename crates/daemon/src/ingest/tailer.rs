// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Streams new lines from a growing log file. Reads the file in full on
//! start, then watches for changes via `notify` with a polling fallback tick
//! so a missed filesystem event is never fatal.

use std::path::PathBuf;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

pub struct Tailer {
    path: PathBuf,
}

impl Tailer {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Spawn the tailer loop onto its own task; returns a channel of raw
    /// lines in arrival order.
    pub fn spawn(self, cancel: CancellationToken) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move { self.run(tx, cancel).await });
        rx
    }

    async fn run(&self, tx: mpsc::UnboundedSender<String>, cancel: CancellationToken) {
        let mut cursor = self.read_from(0, &tx).unwrap_or(0);

        let (notify_tx, mut notify_rx) = mpsc::unbounded_channel();
        let watcher_result: notify::Result<RecommendedWatcher> =
            notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
                if res.is_ok() {
                    let _ = notify_tx.send(());
                }
            });

        let mut watcher = match watcher_result {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::warn!(err = %e, "failed to construct file watcher, falling back to polling only");
                None
            }
        };

        if let Some(watcher) = watcher.as_mut() {
            let watch_target = self.path.parent().unwrap_or(&self.path);
            if let Err(e) = watcher.watch(watch_target, RecursiveMode::NonRecursive) {
                tracing::warn!(err = %e, path = %watch_target.display(), "failed to watch directory");
            }
        }

        let mut poll = tokio::time::interval(POLL_INTERVAL);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = notify_rx.recv() => {
                    if let Some(next) = self.read_from(cursor, &tx) {
                        cursor = next;
                    }
                }
                _ = poll.tick() => {
                    if let Some(next) = self.read_from(cursor, &tx) {
                        cursor = next;
                    }
                }
            }
        }
    }

    /// Read bytes past `cursor`, emit each complete line, and return the new
    /// cursor. Returns `None` on a transient read failure, leaving the
    /// cursor unchanged for the next attempt.
    fn read_from(&self, cursor: u64, tx: &mpsc::UnboundedSender<String>) -> Option<u64> {
        use std::io::{Read, Seek, SeekFrom};

        let mut file = match std::fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Some(cursor),
            Err(e) => {
                tracing::warn!(err = %e, path = %self.path.display(), "tailer read failed, will retry");
                return None;
            }
        };

        let len = file.metadata().ok()?.len();
        if len < cursor {
            // File was truncated or replaced; restart from the top.
            return self.read_from(0, tx).map(|_| 0);
        }
        if len == cursor {
            return Some(cursor);
        }

        if file.seek(SeekFrom::Start(cursor)).is_err() {
            return None;
        }
        let mut buf = String::new();
        if file.read_to_string(&mut buf).is_err() {
            return None;
        }

        for line in buf.lines() {
            if !line.trim().is_empty() {
                let _ = tx.send(line.to_owned());
            }
        }

        Some(len)
    }
}

#[cfg(test)]
#[path = "tailer_tests.rs"]
mod tests;
