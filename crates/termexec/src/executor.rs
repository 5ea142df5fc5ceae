// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The terminal executor: single chokepoint for all multiplexer interaction.
//! Every operation composes argv from validated tokens — never a shell
//! string — and every call is bounded by a timeout.

use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::error::{ExecError, Result};
use crate::validate;

const CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// One entry from `listSessions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub name: String,
}

/// Target of a pane-addressed operation: either an owned session name or an
/// externally observed pane id, optionally on a non-default tmux socket.
#[derive(Debug, Clone)]
pub struct Target {
    pub id: String,
    pub is_pane_id: bool,
    pub socket: Option<String>,
}

impl Target {
    pub fn session(name: impl Into<String>) -> Self {
        Self { id: name.into(), is_pane_id: false, socket: None }
    }

    pub fn pane(pane_id: impl Into<String>, socket: Option<String>) -> Self {
        Self { id: pane_id.into(), is_pane_id: true, socket }
    }

    fn validate(&self) -> Result<()> {
        if self.is_pane_id {
            validate::pane_id(&self.id)
        } else {
            validate::session_name(&self.id)
        }
    }
}

pub struct TerminalExecutor {
    /// The multiplexer binary to invoke, e.g. `"tmux"`.
    binary: String,
}

impl TerminalExecutor {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }

    fn command(&self, socket: Option<&str>) -> Command {
        let mut cmd = Command::new(&self.binary);
        if let Some(socket) = socket {
            cmd.arg("-L").arg(socket);
        }
        cmd
    }

    async fn run(&self, mut cmd: Command) -> Result<std::process::Output> {
        let output = timeout(CALL_TIMEOUT, cmd.output()).await.map_err(|_| ExecError::Timeout)?;
        output.map_err(|e| ExecError::Exec(e.to_string()))
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionInfo>> {
        let mut cmd = self.command(None);
        cmd.arg("list-sessions").arg("-F").arg("#{session_name}");
        let output = self.run(cmd).await?;
        if !output.status.success() {
            // No server running reads as "no sessions", not an error.
            return Ok(Vec::new());
        }
        let text = String::from_utf8_lossy(&output.stdout);
        Ok(text.lines().filter(|l| !l.is_empty()).map(|l| SessionInfo { name: l.to_owned() }).collect())
    }

    pub async fn create_detached(&self, name: &str, cwd: &str) -> Result<()> {
        validate::session_name(name)?;
        validate::cwd(cwd)?;

        let mut cmd = self.command(None);
        cmd.arg("new-session").arg("-d").arg("-s").arg(name).arg("-c").arg(cwd);
        let output = self.run(cmd).await?;
        if !output.status.success() {
            return Err(ExecError::Exec(String::from_utf8_lossy(&output.stderr).into_owned()));
        }
        Ok(())
    }

    pub async fn inject_command(&self, name: &str, command_line: &str) -> Result<()> {
        validate::session_name(name)?;

        let mut cmd = self.command(None);
        cmd.arg("send-keys").arg("-t").arg(name).arg(command_line).arg("Enter");
        let output = self.run(cmd).await?;
        if !output.status.success() {
            return Err(ExecError::Exec(String::from_utf8_lossy(&output.stderr).into_owned()));
        }
        Ok(())
    }

    pub async fn kill(&self, name: &str) -> Result<()> {
        validate::session_name(name)?;
        let mut cmd = self.command(None);
        cmd.arg("kill-session").arg("-t").arg(name);
        let output = self.run(cmd).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("can't find session") {
                return Err(ExecError::NotFound(name.to_owned()));
            }
            return Err(ExecError::Exec(stderr.into_owned()));
        }
        Ok(())
    }

    pub async fn capture_pane(&self, target: &Target, start_line: Option<i64>) -> Result<String> {
        target.validate()?;
        let mut cmd = self.command(target.socket.as_deref());
        cmd.arg("capture-pane").arg("-p").arg("-t").arg(&target.id);
        if let Some(start) = start_line {
            cmd.arg("-S").arg(start.to_string());
        }
        let output = self.run(cmd).await?;
        if !output.status.success() {
            return Err(ExecError::NotFound(target.id.clone()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub async fn send_keys(&self, target: &Target, keys: &[&str]) -> Result<()> {
        target.validate()?;
        let mut cmd = self.command(target.socket.as_deref());
        cmd.arg("send-keys").arg("-t").arg(&target.id);
        for key in keys {
            cmd.arg(key);
        }
        let output = self.run(cmd).await?;
        if !output.status.success() {
            return Err(ExecError::Exec(String::from_utf8_lossy(&output.stderr).into_owned()));
        }
        Ok(())
    }

    pub async fn pane_exists(&self, pane_id: &str, socket: Option<&str>) -> Result<bool> {
        validate::pane_id(pane_id)?;
        let mut cmd = self.command(socket);
        cmd.arg("display-message").arg("-p").arg("-t").arg(pane_id).arg("#{pane_id}");
        let output = self.run(cmd).await?;
        Ok(output.status.success())
    }

    /// Write `text` to a fresh unique temp file, load it as a paste buffer,
    /// paste into `target`, and optionally follow with Enter. The temp file
    /// is removed on every exit path, success or failure.
    pub async fn paste(&self, target: &Target, text: &str, send_enter: bool) -> Result<()> {
        target.validate()?;

        let file = tempfile::NamedTempFile::new().map_err(|e| ExecError::Exec(e.to_string()))?;
        let path = file.path().to_path_buf();
        if let Err(e) = std::fs::write(&path, text) {
            return Err(ExecError::Exec(e.to_string()));
        }

        let result = self.paste_from_file(target, &path, send_enter).await;

        if let Err(e) = file.close() {
            tracing::warn!(err = %e, "failed to remove paste buffer temp file");
        }

        result
    }

    async fn paste_from_file(
        &self,
        target: &Target,
        path: &std::path::Path,
        send_enter: bool,
    ) -> Result<()> {
        let buffer_name = format!("termexec-{}", uuid_like());

        let mut load = self.command(target.socket.as_deref());
        load.arg("load-buffer").arg("-b").arg(&buffer_name).arg(path);
        let output = self.run(load).await?;
        if !output.status.success() {
            return Err(ExecError::Exec(String::from_utf8_lossy(&output.stderr).into_owned()));
        }

        let mut paste = self.command(target.socket.as_deref());
        paste.arg("paste-buffer").arg("-b").arg(&buffer_name).arg("-t").arg(&target.id);
        let output = self.run(paste).await?;

        let mut delete = self.command(target.socket.as_deref());
        delete.arg("delete-buffer").arg("-b").arg(&buffer_name);
        let _ = self.run(delete).await;

        if !output.status.success() {
            return Err(ExecError::Exec(String::from_utf8_lossy(&output.stderr).into_owned()));
        }

        if send_enter {
            self.send_keys(target, &["Enter"]).await?;
        }
        Ok(())
    }
}

/// A short unique token for scoping a paste buffer name, without pulling in
/// a UUID dependency for one call site.
fn uuid_like() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("{nanos:x}")
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
