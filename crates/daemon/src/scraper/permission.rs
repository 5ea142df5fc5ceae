// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Permission prompt detector: finds an on-screen permission prompt, parses
//! its numbered options, and infers which tool triggered it. Also detects
//! the one-time "bypass permissions" warning and auto-acknowledges it.
//!
//! Only this scraper writes a session's `pendingPermission` and
//! `bypassWarningHandled` fields (shared-resource policy).

use std::sync::LazyLock;

use regex::Regex;

use crate::event::{PendingPermission, PermissionOption};

const FOOTER_WINDOW: usize = 6;
const OPTION_LOOKAHEAD: usize = 10;
const TOOL_LOOKBEHIND: usize = 15;

#[allow(clippy::unwrap_used)]
static PROMPT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(do you want|would you like) to proceed\?").unwrap());

#[allow(clippy::unwrap_used)]
static OPTION_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(\d+)[.)]\s*(.+)$").unwrap());

#[allow(clippy::unwrap_used)]
static TOOL_CALL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[•●-]\s*([A-Za-z][A-Za-z0-9_]*)\(").unwrap());

const KNOWN_TOOLS: &[&str] = &["Bash", "Edit", "Write", "Read", "Glob", "Grep", "WebFetch", "WebSearch"];

/// Returns the prompt line's index plus parsed options, or `None` if no
/// genuine prompt is on screen (the pattern matched but neither a footer cue
/// nor a pointer marker confirms it — a false positive, e.g. from history).
pub fn detect(capture: &str) -> Option<PendingPermission> {
    let lines: Vec<&str> = capture.lines().collect();
    let prompt_idx = lines.iter().rposition(|line| PROMPT_PATTERN.is_match(line))?;

    let window_end = (prompt_idx + FOOTER_WINDOW).min(lines.len());
    let has_cue = lines[prompt_idx..window_end].iter().any(|line| {
        line.contains("Esc to cancel") || line.contains("ctrl-g to edit") || line.contains('❯')
    });
    if !has_cue {
        return None;
    }

    let mut options = Vec::new();
    let option_window_end = (prompt_idx + 1 + OPTION_LOOKAHEAD).min(lines.len());
    for line in &lines[prompt_idx + 1..option_window_end] {
        if let Some(caps) = OPTION_PATTERN.captures(line.trim_start_matches('❯').trim()) {
            let number: u32 = caps[1].parse().ok()?;
            options.push(PermissionOption { number, label: caps[2].trim().to_owned() });
        }
    }

    let tool = infer_tool(&lines, prompt_idx);
    let context = lines[prompt_idx].trim().to_owned();

    Some(PendingPermission { tool, context, options, detected_at: crate::event::Event::now_ms() })
}

fn infer_tool(lines: &[&str], prompt_idx: usize) -> Option<String> {
    let lookbehind_start = prompt_idx.saturating_sub(TOOL_LOOKBEHIND);
    for line in lines[lookbehind_start..prompt_idx].iter().rev() {
        if let Some(caps) = TOOL_CALL_PATTERN.captures(line) {
            return Some(caps[1].to_owned());
        }
        if let Some(known) = KNOWN_TOOLS.iter().find(|t| line.contains(**t)) {
            return Some((*known).to_owned());
        }
    }
    None
}

/// The one-time warning shown when an agent is launched with permissions
/// skipped. The auto-ack option is always `"2"`.
pub fn detect_bypass_warning(capture: &str) -> bool {
    capture.contains("bypass permissions") || capture.contains("Bypass Permissions")
}

pub const BYPASS_ACK_KEY: &str = "2";

#[cfg(test)]
#[path = "permission_tests.rs"]
mod tests;
