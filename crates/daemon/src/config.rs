// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;

/// Local supervisor daemon for concurrent coding-assistant sessions.
#[derive(Debug, Clone, Parser)]
#[command(name = "supervisord", version, about)]
pub struct Config {
    /// HTTP + WebSocket port to listen on.
    #[arg(long, env = "PORT", default_value = "4317")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Optional named origin allowed by CORS in addition to loopback.
    #[arg(long, env = "ALLOWED_ORIGIN")]
    pub allowed_origin: Option<String>,

    /// Append-only event log path.
    #[arg(long, env = "EVENTS_FILE")]
    pub events_file: Option<PathBuf>,

    /// Core session store path.
    #[arg(long, env = "SESSIONS_FILE")]
    pub sessions_file: Option<PathBuf>,

    /// UI metadata store path.
    #[arg(long, env = "METADATA_FILE")]
    pub metadata_file: Option<PathBuf>,

    /// Text-tile store path.
    #[arg(long, env = "TILES_FILE")]
    pub tiles_file: Option<PathBuf>,

    /// Maximum entries retained in the dedup/history window.
    #[arg(long, env = "MAX_EVENTS", default_value = "5000")]
    pub max_events: usize,

    /// Name prefix used for multiplexer sessions the daemon spawns.
    #[arg(long, env = "TMUX_SESSION", default_value = "supervisord")]
    pub tmux_session_prefix: String,

    /// Enable verbose debug logging.
    #[arg(long, env = "DEBUG", default_value_t = false)]
    pub debug: bool,

    /// Enable field-detection trace logging in the event processor. Never
    /// changes the normalized output, only the verbosity of its logging.
    #[arg(long, env = "TRACE", default_value_t = false)]
    pub trace: bool,

    /// Log output format (json or text).
    #[arg(long, env = "LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Resolve `~`-prefixed paths against `$HOME`, mirroring the app's data
    /// directory layout: `~/.supervisord/data/*`.
    pub fn data_dir() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_owned());
        PathBuf::from(home).join(".supervisord").join("data")
    }

    pub fn events_path(&self) -> PathBuf {
        self.events_file.clone().unwrap_or_else(|| Self::data_dir().join("events.jsonl"))
    }

    pub fn sessions_path(&self) -> PathBuf {
        self.sessions_file.clone().unwrap_or_else(|| Self::data_dir().join("sessions.json"))
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.metadata_file.clone().unwrap_or_else(|| Self::data_dir().join("cin-metadata.json"))
    }

    pub fn tiles_path(&self) -> PathBuf {
        self.tiles_file.clone().unwrap_or_else(|| Self::data_dir().join("tiles.json"))
    }

    /// Effective log level, honoring `RUST_LOG` as a fallback when unset.
    pub fn effective_log_filter(&self) -> String {
        if self.log_level == "info" && std::env::var("LOG_LEVEL").is_err() {
            std::env::var("RUST_LOG").unwrap_or_else(|_| self.log_level.clone())
        } else {
            self.log_level.clone()
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
