// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Suggestion extractor: reads the tail of scrollback for a session that is
//! waiting or idle and surfaces the last prompt-like line as a "next prompt"
//! hint the UI can offer, and the auto-accept loop can submit.
//!
//! Only runs for sessions whose status is `waiting` or `idle` — the caller
//! is responsible for that gate; this module is pure parsing.

const TAIL_LINES: usize = 20;

fn strip_ui_hints(line: &str) -> &str {
    // Trailing hint text the UI renders after the actual suggestion, e.g.
    // "(esc to clear)". Cut at the first such marker.
    if let Some(idx) = line.find('(') {
        line[..idx].trim_end()
    } else {
        line.trim_end()
    }
}

fn is_non_suggestion(candidate: &str) -> bool {
    let lower = candidate.to_lowercase();
    candidate.is_empty()
        || candidate.starts_with('[')
        || lower.contains("tokens")
        || lower.contains("bypass permissions")
        || candidate.len() <= 2
}

/// Extract the last candidate suggestion from the tail of a capture, or
/// `None` if nothing qualifies.
pub fn extract(capture: &str) -> Option<String> {
    let lines: Vec<&str> = capture.lines().collect();
    let tail_start = lines.len().saturating_sub(TAIL_LINES);

    for line in lines[tail_start..].iter().rev() {
        let trimmed = line.trim_start();
        let rest = trimmed.strip_prefix("❯ ").or_else(|| trimmed.strip_prefix("> "));
        let Some(rest) = rest else { continue };

        let candidate = strip_ui_hints(rest).trim().to_owned();
        if is_non_suggestion(&candidate) {
            continue;
        }
        return Some(candidate);
    }
    None
}

#[cfg(test)]
#[path = "suggestion_tests.rs"]
mod tests;
