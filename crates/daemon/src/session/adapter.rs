// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent adapter table.
//!
//! Dynamic dispatch by agent kind is modeled as a table keyed by agent name,
//! each entry implementing a small capability set. This replaces the
//! per-agent driver modules the supervisor is grounded on with a single
//! trait object dispatched through [`AdapterTable`].

use std::collections::HashMap;

use crate::event::Event;

/// Flags that shape how a session is launched or restarted.
#[derive(Debug, Clone, Default)]
pub struct LaunchFlags {
    pub continue_session: bool,
    pub skip_permissions: bool,
    pub extras: Vec<String>,
}

/// Per-agent capability set. Implementors never see a `Session`, only the
/// narrow inputs each operation needs — this keeps the adapter table free of
/// cyclic references back into the registry.
pub trait Adapter: Send + Sync {
    /// Argv used when spawning (or injecting into) the multiplexer session.
    fn launch_command(&self, flags: &LaunchFlags, cwd: &str) -> Vec<String>;

    /// Extract this agent's own session identifier from a normalized event.
    /// Returns `None` if the event carries no recognizable identifier.
    fn extract_agent_session_id(&self, event: &Event) -> Option<String>;

    /// Argv used to restart a session after `command: restart`.
    fn restart_command(&self, cwd: &str) -> Vec<String>;

    /// Optional preprocessing for a prompt plus image attachments (e.g.
    /// inlining images as markdown references). Default: pass the prompt
    /// through unchanged, ignoring attachments.
    fn preprocess_prompt(&self, prompt: &str, _attachments: &[ImageAttachment]) -> String {
        prompt.to_owned()
    }
}

/// One inlined image attachment on a `send-prompt` request.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub data_base64: String,
    pub media_type: String,
    pub name: Option<String>,
}

/// A generic adapter for agents that take a plain positional prompt and a
/// `--continue`/`--dangerously-skip-permissions`-style flag set. Most agent
/// integrations differ only in flag spelling, so this single implementation
/// covers them, parameterized by binary name and flag names.
pub struct GenericAdapter {
    pub binary: String,
    pub continue_flag: &'static str,
    pub skip_permissions_flag: &'static str,
    pub session_id_field: &'static [&'static str],
}

impl Adapter for GenericAdapter {
    fn launch_command(&self, flags: &LaunchFlags, _cwd: &str) -> Vec<String> {
        let mut argv = vec![self.binary.clone()];
        if flags.continue_session {
            argv.push(self.continue_flag.to_owned());
        }
        if flags.skip_permissions {
            argv.push(self.skip_permissions_flag.to_owned());
        }
        argv.extend(flags.extras.iter().cloned());
        argv
    }

    fn extract_agent_session_id(&self, event: &Event) -> Option<String> {
        if !event.agent_session_id.is_empty() {
            return Some(event.agent_session_id.clone());
        }
        None
    }

    fn restart_command(&self, cwd: &str) -> Vec<String> {
        self.launch_command(&LaunchFlags::default(), cwd)
    }
}

/// Table of adapters keyed by agent name.
#[derive(Default)]
pub struct AdapterTable {
    adapters: HashMap<String, Box<dyn Adapter>>,
}

impl AdapterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, agent: impl Into<String>, adapter: Box<dyn Adapter>) {
        self.adapters.insert(agent.into(), adapter);
    }

    pub fn get(&self, agent: &str) -> Option<&dyn Adapter> {
        self.adapters.get(agent).map(|a| a.as_ref())
    }

    /// The default table wired with the adapters this supervisor ships: one
    /// for each of the two agent kinds named in the session catalog.
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.register(
            "agent-a",
            Box::new(GenericAdapter {
                binary: "agent-a".to_owned(),
                continue_flag: "--continue",
                skip_permissions_flag: "--dangerously-skip-permissions",
                session_id_field: &["session_id"],
            }),
        );
        table.register(
            "agent-b",
            Box::new(GenericAdapter {
                binary: "agent-b".to_owned(),
                continue_flag: "--resume",
                skip_permissions_flag: "--yolo",
                session_id_field: &["session_id"],
            }),
        );
        table
    }
}

#[cfg(test)]
#[path = "adapter_tests.rs"]
mod tests;
