// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end binary smoke tests.
//!
//! Spawns the real `supervisord` binary as a subprocess and exercises it
//! over its HTTP and WebSocket surface.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

/// Resolve the path to the compiled `supervisord` binary.
pub fn supervisord_binary() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join("supervisord")
}

/// Find a free TCP port by binding to :0 then releasing.
pub fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// A running `supervisord` process, killed on drop, with an isolated
/// `~/.supervisord/data`-equivalent state directory.
pub struct SupervisordProcess {
    child: Child,
    port: u16,
    _data_dir: tempfile::TempDir,
}

impl SupervisordProcess {
    /// Spawn against a fresh port and a fresh, isolated data directory.
    pub fn start() -> anyhow::Result<Self> {
        let port = free_port()?;
        let data_dir = tempfile::tempdir()?;

        let child = Command::new(supervisord_binary())
            .env("PORT", port.to_string())
            .env("HOST", "127.0.0.1")
            .env("EVENTS_FILE", data_dir.path().join("events.jsonl"))
            .env("SESSIONS_FILE", data_dir.path().join("sessions.json"))
            .env("METADATA_FILE", data_dir.path().join("cin-metadata.json"))
            .env("TILES_FILE", data_dir.path().join("tiles.json"))
            .env("LOG_FORMAT", "text")
            .env("LOG_LEVEL", "warn")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        Ok(Self { child, port, _data_dir: data_dir })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/ws", self.port)
    }

    /// Poll `/health` until it responds successfully.
    pub async fn wait_healthy(&self, timeout: Duration) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        let client = reqwest::Client::new();
        let url = format!("{}/health", self.base_url());
        loop {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("supervisord did not become healthy within {timeout:?}");
            }
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Drop for SupervisordProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
