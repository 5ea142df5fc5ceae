// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn create_detached_rejects_invalid_session_name_without_spawning() {
    let executor = TerminalExecutor::new("tmux-binary-that-does-not-exist-xyz");
    let dir = tempfile::tempdir().expect("tempdir");
    let result = executor.create_detached("bad name", &dir.path().display().to_string()).await;
    assert_eq!(result, Err(ExecError::Validation("invalid session name: bad name".into())));
}

#[tokio::test]
async fn create_detached_rejects_missing_cwd() {
    let executor = TerminalExecutor::new("tmux-binary-that-does-not-exist-xyz");
    let result = executor.create_detached("valid-name", "/definitely/missing/path").await;
    assert!(matches!(result, Err(ExecError::Validation(_))));
}

#[tokio::test]
async fn missing_binary_surfaces_as_exec_error() {
    let executor = TerminalExecutor::new("tmux-binary-that-does-not-exist-xyz");
    let result = executor.list_sessions().await;
    assert!(matches!(result, Err(ExecError::Exec(_))));
}

#[tokio::test]
async fn capture_pane_rejects_malformed_pane_id() {
    let executor = TerminalExecutor::new("tmux-binary-that-does-not-exist-xyz");
    let target = Target::pane("not-a-pane-id", None);
    let result = executor.capture_pane(&target, None).await;
    assert!(matches!(result, Err(ExecError::Validation(_))));
}

#[tokio::test]
async fn paste_rejects_invalid_session_target() {
    let executor = TerminalExecutor::new("tmux-binary-that-does-not-exist-xyz");
    let target = Target::session("bad name");
    let result = executor.paste(&target, "hello", true).await;
    assert!(matches!(result, Err(ExecError::Validation(_))));
}
