// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::Config;
use crate::push::PushHub;
use crate::session::adapter::AdapterTable;
use std::path::Path;

const DEAD_BINARY: &str = "tmux-binary-that-does-not-exist-xyz";

fn make_config(dir: &Path) -> Config {
    Config {
        port: 0,
        host: "127.0.0.1".into(),
        allowed_origin: None,
        events_file: Some(dir.join("events.jsonl")),
        sessions_file: Some(dir.join("sessions.json")),
        metadata_file: Some(dir.join("metadata.json")),
        tiles_file: Some(dir.join("tiles.json")),
        max_events: 100,
        tmux_session_prefix: "test".into(),
        debug: false,
        trace: false,
        log_format: "json".into(),
        log_level: "info".into(),
    }
}

fn registry(dir: &Path) -> Registry {
    Registry::load(Arc::new(make_config(dir)), Arc::new(AdapterTable::with_defaults()), Arc::new(PushHub::new()))
}

#[tokio::test]
async fn create_session_rejects_missing_cwd() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = registry(dir.path());
    let executor = TerminalExecutor::new(DEAD_BINARY);

    let req = CreateSessionRequest {
        cwd: "/definitely/missing/path".into(),
        agent: "agent-a".into(),
        ..Default::default()
    };
    let result = create_session(&registry, &executor, req).await;
    assert_eq!(result.unwrap_err().code, crate::error::ErrorCode::Validation);
}

#[tokio::test]
async fn create_session_rejects_unknown_agent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = registry(dir.path());
    let executor = TerminalExecutor::new(DEAD_BINARY);

    let req = CreateSessionRequest { cwd: dir.path().display().to_string(), agent: "ghost-agent".into(), ..Default::default() };
    let result = create_session(&registry, &executor, req).await;
    assert_eq!(result.unwrap_err().code, crate::error::ErrorCode::Validation);
}

#[tokio::test]
async fn create_session_surfaces_executor_failure_as_external_without_recording_a_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = registry(dir.path());
    let executor = TerminalExecutor::new(DEAD_BINARY);

    let req = CreateSessionRequest { cwd: dir.path().display().to_string(), agent: "agent-a".into(), ..Default::default() };
    let result = create_session(&registry, &executor, req).await;
    assert_eq!(result.unwrap_err().code, crate::error::ErrorCode::External);
    assert!(registry.list().await.is_empty());
}

#[tokio::test]
async fn send_prompt_reports_not_found_for_unknown_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = registry(dir.path());
    let executor = TerminalExecutor::new(DEAD_BINARY);

    let result = send_prompt(&registry, &executor, "nope", "hi", &[]).await;
    assert_eq!(result.unwrap_err().code, crate::error::ErrorCode::NotFound);
}

#[tokio::test]
async fn send_prompt_conflicts_for_external_session_without_pane() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = registry(dir.path());
    let executor = TerminalExecutor::new(DEAD_BINARY);

    let id = registry.find_or_create_session("agent-sid", "agent-a", "/tmp/proj", None).await;
    let result = send_prompt(&registry, &executor, &id, "hi", &[]).await;
    assert_eq!(result.unwrap_err().code, crate::error::ErrorCode::Conflict);
}

#[tokio::test]
async fn cancel_conflicts_for_external_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = registry(dir.path());
    let executor = TerminalExecutor::new(DEAD_BINARY);

    let id = registry.find_or_create_session("agent-sid", "agent-a", "/tmp/proj", None).await;
    let result = cancel(&registry, &executor, &id).await;
    assert_eq!(result.unwrap_err().code, crate::error::ErrorCode::Conflict);
}

#[tokio::test]
async fn restart_conflicts_for_external_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = registry(dir.path());
    let executor = TerminalExecutor::new(DEAD_BINARY);

    let id = registry.find_or_create_session("agent-sid", "agent-a", "/tmp/proj", None).await;
    let result = restart(&registry, &executor, &id).await;
    assert_eq!(result.unwrap_err().code, crate::error::ErrorCode::Conflict);
}

#[tokio::test]
async fn permission_response_conflicts_without_a_pending_prompt() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = registry(dir.path());
    let executor = TerminalExecutor::new(DEAD_BINARY);

    let id = registry.find_or_create_session("agent-sid", "agent-a", "/tmp/proj", None).await;
    let result = permission_response(&registry, &executor, &id, 1).await;
    assert_eq!(result.unwrap_err().code, crate::error::ErrorCode::Conflict);
}

#[tokio::test]
async fn permission_response_rejects_an_unlisted_option_number() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = registry(dir.path());
    let executor = TerminalExecutor::new(DEAD_BINARY);

    let id = registry.find_or_create_session("agent-sid", "agent-a", "/tmp/proj", None).await;
    registry
        .mark_waiting_on_permission(
            &id,
            Some("Bash".into()),
            crate::event::PendingPermission {
                tool: Some("Bash".into()),
                context: "Do you want to proceed?".into(),
                options: vec![crate::event::PermissionOption { number: 1, label: "Yes".into() }],
                detected_at: 0,
            },
        )
        .await;

    let result = permission_response(&registry, &executor, &id, 9).await;
    assert_eq!(result.unwrap_err().code, crate::error::ErrorCode::Validation);
}

#[tokio::test]
async fn delete_session_reports_not_found_for_unknown_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = registry(dir.path());
    let executor = TerminalExecutor::new(DEAD_BINARY);

    let result = delete_session(&registry, &executor, "nope").await;
    assert_eq!(result.unwrap_err().code, crate::error::ErrorCode::NotFound);
}

#[tokio::test]
async fn delete_session_removes_an_external_session_without_touching_the_executor() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = registry(dir.path());
    let executor = TerminalExecutor::new(DEAD_BINARY);

    let id = registry.find_or_create_session("agent-sid", "agent-a", "/tmp/proj", None).await;
    delete_session(&registry, &executor, &id).await.expect("delete succeeds");
    assert!(registry.get(&id).await.is_none());
}

#[test]
fn shell_words_join_quotes_tokens_with_whitespace() {
    let argv = vec!["agent-a".to_owned(), "--continue".to_owned(), "do the thing".to_owned()];
    assert_eq!(shell_words_join(&argv), "agent-a --continue 'do the thing'");
}
