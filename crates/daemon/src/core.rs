// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process wiring: constructs every long-lived component explicitly (no
//! module-level singletons) and spawns the background loops. A `Core` is
//! built once at startup and handed around as an `Arc` — it is the shared
//! state behind both the background tasks and the HTTP/WS surface.

use std::sync::Arc;

use termexec::TerminalExecutor;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::ingest;
use crate::ingest::log::EventLog;
use crate::ingest::tailer::Tailer;
use crate::ingest::transcript::{SessionNew, TranscriptWatcher};
use crate::push::PushHub;
use crate::scheduler;
use crate::scraper;
use crate::session::adapter::AdapterTable;
use crate::session::registry::Registry;

pub struct Core {
    pub config: Arc<Config>,
    pub registry: Arc<Registry>,
    pub event_log: Arc<EventLog>,
    pub push: Arc<PushHub>,
    pub executor: Arc<TerminalExecutor>,
    pub transcripts: Arc<TranscriptWatcher>,
}

impl Core {
    /// Construct every component. Loads session/metadata stores from disk
    /// (best-effort, never fatal); does not spawn anything yet.
    pub fn new(config: Config) -> Arc<Self> {
        let config = Arc::new(config);
        let push = Arc::new(PushHub::new());
        let adapters = Arc::new(AdapterTable::with_defaults());
        let registry = Arc::new(Registry::load(Arc::clone(&config), adapters, Arc::clone(&push)));
        let event_log = Arc::new(EventLog::new(config.events_path(), config.max_events));
        let executor = Arc::new(TerminalExecutor::new("tmux"));
        let transcripts_root = Config::data_dir().join("transcripts");
        let transcripts = Arc::new(TranscriptWatcher::new("agent-a", transcripts_root));

        Arc::new(Self { config, registry, event_log, push, executor, transcripts })
    }

    /// Spawn the background loops: the event log tailer, transcript watcher,
    /// scrapers, and scheduler. Returns immediately; everything runs until
    /// `cancel` fires.
    pub async fn spawn_background_tasks(self: &Arc<Self>, cancel: CancellationToken) {
        // Loading the event log's history happens after sessions are loaded
        // (4.5's ordering rule); `apply_event`'s replay-window check inside
        // `ingest_line` takes care of ignoring stale entries.
        for mut event in self.event_log.load_history().await {
            if event.agent_session_id.is_empty() || event.agent.is_empty() {
                continue;
            }
            let session_id = self
                .registry
                .find_or_create_session(&event.agent_session_id, &event.agent, &event.cwd, None)
                .await;
            event.session_id = Some(session_id);
            self.registry.apply_event(&mut event).await;
        }

        let mut tailer_rx = Tailer::new(self.config.events_path()).spawn(cancel.clone());
        let trace = self.config.trace;
        {
            let registry = Arc::clone(&self.registry);
            let event_log = Arc::clone(&self.event_log);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        line = tailer_rx.recv() => {
                            let Some(line) = line else { break };
                            ingest::ingest_line(&registry, &event_log, &line, trace, None).await;
                        }
                    }
                }
            });
        }

        {
            let mut announcements = Arc::clone(&self.transcripts).spawn(Arc::clone(&self.event_log), cancel.clone());
            let this = Arc::clone(self);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        announcement = announcements.recv() => {
                            let Some(announcement) = announcement else { break };
                            this.announce_session_new(vec![announcement]).await;
                        }
                    }
                }
            });
        }

        scraper::spawn_all(Arc::clone(&self.registry), Arc::clone(&self.executor), cancel.clone());
        scheduler::spawn_all(
            Arc::clone(&self.registry),
            Arc::clone(&self.executor),
            Arc::clone(&self.transcripts),
            cancel,
        );
    }

    /// Broadcast `session_new` for each announcement. Shared by the
    /// background transcript-poll loop and the `/event/<agent>` fast path,
    /// which forces an immediate rescan instead of waiting for the next
    /// poll tick.
    pub async fn announce_session_new(&self, announcements: Vec<SessionNew>) {
        for announcement in announcements {
            self.push
                .broadcast(
                    "session_new",
                    serde_json::json!({
                        "threadId": announcement.thread_id,
                        "cwd": announcement.cwd,
                        "displayName": announcement.display_name,
                    }),
                )
                .await;
        }
    }
}
