// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::http::StatusCode;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::Core;
use crate::transport::build_router;

fn test_config(dir: &std::path::Path) -> Config {
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

async fn test_core() -> (Arc<Core>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let core = Core::new(test_config(dir.path()));
    core.spawn_background_tasks(CancellationToken::new()).await;
    (core, dir)
}

#[tokio::test]
async fn health_reports_ok_and_event_count() {
    let (core, _dir) = test_core().await;
    let app = build_router(core);
    let server = axum_test::TestServer::new(app).expect("server");

    let resp = server.get("/health").await;
    resp.assert_status(StatusCode::OK);
    let body = resp.text();
    assert!(body.contains("\"ok\":true"), "body: {body}");
}

#[tokio::test]
async fn create_session_rejects_unknown_agent() {
    let (core, dir) = test_core().await;
    let app = build_router(core);
    let server = axum_test::TestServer::new(app).expect("server");

    let resp = server
        .post("/sessions")
        .json(&serde_json::json!({ "cwd": dir.path().to_string_lossy(), "agent": "not-a-real-agent" }))
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_unknown_session_is_404() {
    let (core, _dir) = test_core().await;
    let app = build_router(core);
    let server = axum_test::TestServer::new(app).expect("server");

    let resp = server.get("/sessions/sdeadbeef").await;
    resp.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_session_id_is_rejected_before_lookup() {
    let (core, _dir) = test_core().await;
    let app = build_router(core);
    let server = axum_test::TestServer::new(app).expect("server");

    let resp = server.get("/sessions/not-a-valid-id!!").await;
    resp.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_sessions_starts_empty() {
    let (core, _dir) = test_core().await;
    let app = build_router(core);
    let server = axum_test::TestServer::new(app).expect("server");

    let resp = server.get("/sessions").await;
    resp.assert_status(StatusCode::OK);
    let body = resp.text();
    assert!(body.contains("\"sessions\":[]"), "body: {body}");
}

#[tokio::test]
async fn event_endpoint_accepts_a_normalized_line() {
    let (core, _dir) = test_core().await;
    let app = build_router(core);
    let server = axum_test::TestServer::new(app).expect("server");

    let line = serde_json::json!({
        "id": "e-http-1",
        "agent": "agent-a",
        "agentSessionId": "sid-http-1",
        "cwd": "/tmp/proj",
        "kind": "tool_use",
        "timestamp": 0,
    })
    .to_string();

    let resp = server.post("/event").text(line).await;
    resp.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn files_endpoints_reject_path_escape_for_unknown_session() {
    let (core, _dir) = test_core().await;
    let app = build_router(core);
    let server = axum_test::TestServer::new(app).expect("server");

    let resp = server.get("/sessions/sdeadbeef/file").add_query_param("path", "x.txt").await;
    resp.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cleanup_rejects_unknown_kind() {
    let (core, _dir) = test_core().await;
    let app = build_router(core);
    let server = axum_test::TestServer::new(app).expect("server");

    let resp = server.delete("/sessions/cleanup").add_query_param("type", "bogus").await;
    resp.assert_status(StatusCode::BAD_REQUEST);
}
