// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::session::{SessionKind, TerminalDescriptor};

fn sample_session(id: &str) -> Session {
    Session {
        id: id.to_owned(),
        name: "proj".into(),
        kind: SessionKind::Internal,
        agent: "agent-a".into(),
        status: Status::Working,
        terminal: TerminalDescriptor {
            multiplexer_session: Some("supervisord-abc123".into()),
            ..Default::default()
        },
        cwd: "/tmp/work".into(),
        agent_session_id: Some("agent-sid".into()),
        current_tool: Some("Bash".into()),
        zone_position: None,
        suggestion: None,
        auto_accept: false,
        created_at: 1,
        last_activity: 2,
        git_status: None,
        image_quota: None,
        pending_permission: None,
        tokens: Default::default(),
        bypass_warning_handled: false,
    }
}

#[test]
fn missing_file_yields_empty_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = load_core(&dir.path().join("missing.json"));
    assert!(store.sessions.is_empty());
    assert_eq!(store.counter, 0);
}

#[test]
fn corrupt_file_is_logged_and_treated_as_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("sessions.json");
    std::fs::write(&path, "{not json").expect("write");
    let store = load_core(&path);
    assert!(store.sessions.is_empty());
}

#[test]
fn round_trip_resets_status_and_current_tool() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("sessions.json");
    let mut store = CoreStore::default();
    store.sessions.push(sample_session("s1"));
    store.counter = 1;
    save_core(&path, &store).expect("save");

    let loaded = load_core(&path);
    assert_eq!(loaded.sessions.len(), 1);
    assert_eq!(loaded.sessions[0].status, Status::Offline);
    assert!(loaded.sessions[0].current_tool.is_none());
    // Everything else about the session survives the round trip (L1).
    assert_eq!(loaded.sessions[0].cwd, "/tmp/work");
    assert_eq!(loaded.sessions[0].agent_session_id.as_deref(), Some("agent-sid"));
}

#[test]
fn metadata_merges_into_session() {
    let mut session = sample_session("s1");
    let entry = MetadataEntry {
        zone_position: Some(serde_json::json!({"x": 1})),
        suggestion: Some("rerun tests".into()),
        auto_accept: true,
    };
    merge_metadata(&mut session, Some(&entry));
    assert_eq!(session.suggestion.as_deref(), Some("rerun tests"));
    assert!(session.auto_accept);
}

#[test]
fn metadata_absent_leaves_session_unchanged() {
    let mut session = sample_session("s1");
    session.suggestion = Some("keep me".into());
    merge_metadata(&mut session, None);
    assert_eq!(session.suggestion.as_deref(), Some("keep me"));
}
