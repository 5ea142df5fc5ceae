// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-file persistence for the session registry.
//!
//! Core state (sessions, the agent-session-id index, and the id counter) is
//! owned by the registry. UI metadata (zone position, suggestion, auto
//! accept) is owned by a thin wrapper and merged into sessions on read.
//! Either file missing is normal on first run; parse errors are logged and
//! treated as empty, never fatal (I7).

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Session, Status};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreStore {
    pub sessions: Vec<Session>,
    pub agent_index: HashMap<String, String>,
    pub counter: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_position: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default)]
    pub auto_accept: bool,
}

pub type MetadataStore = HashMap<String, MetadataEntry>;

/// Load the core store, logging and treating parse errors as empty state.
pub fn load_core(path: &Path) -> CoreStore {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<CoreStore>(&contents) {
            Ok(mut store) => {
                // All loaded sessions start offline; liveness probes promote
                // them back as appropriate once the scheduler confirms them.
                for session in &mut store.sessions {
                    session.status = Status::Offline;
                    session.current_tool = None;
                }
                store
            }
            Err(e) => {
                tracing::warn!(err = %e, path = %path.display(), "failed to parse session core store");
                CoreStore::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => CoreStore::default(),
        Err(e) => {
            tracing::warn!(err = %e, path = %path.display(), "failed to read session core store");
            CoreStore::default()
        }
    }
}

/// Load the metadata store, same best-effort semantics as [`load_core`].
pub fn load_metadata(path: &Path) -> MetadataStore {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
            tracing::warn!(err = %e, path = %path.display(), "failed to parse metadata store");
            MetadataStore::default()
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => MetadataStore::default(),
        Err(e) => {
            tracing::warn!(err = %e, path = %path.display(), "failed to read metadata store");
            MetadataStore::default()
        }
    }
}

/// Merge a loaded metadata entry into a session's UI fields.
pub fn merge_metadata(session: &mut Session, entry: Option<&MetadataEntry>) {
    if let Some(entry) = entry {
        session.zone_position = entry.zone_position.clone();
        session.suggestion = entry.suggestion.clone();
        session.auto_accept = entry.auto_accept;
    }
}

fn write_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

pub fn save_core(path: &Path, store: &CoreStore) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(store)?;
    write_atomic(path, &json)
}

pub fn save_metadata(path: &Path, store: &MetadataStore) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(store)?;
    write_atomic(path, &json)
}

#[cfg(test)]
#[path = "persistence_tests.rs"]
mod tests;
