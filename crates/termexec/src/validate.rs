// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pre-flight validation. Every operation composes argv from validated
//! tokens; a violation here means the underlying process is never invoked.

use std::path::Path;

use crate::error::{ExecError, Result};

const SHELL_METACHARACTERS: &[char] =
    &[';', '&', '|', '`', '$', '(', ')', '{', '}', '[', ']', '<', '>', '\\', '\'', '"', '!', '#', '*', '?'];

pub fn session_name(name: &str) -> Result<()> {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        Ok(())
    } else {
        Err(ExecError::Validation(format!("invalid session name: {name}")))
    }
}

pub fn pane_id(id: &str) -> Result<()> {
    let valid = id.strip_prefix('%').is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()));
    if valid {
        Ok(())
    } else {
        Err(ExecError::Validation(format!("invalid pane id: {id}")))
    }
}

pub fn cwd(path: &str) -> Result<()> {
    if path.chars().any(|c| SHELL_METACHARACTERS.contains(&c)) {
        return Err(ExecError::Validation(format!("cwd contains shell metacharacters: {path}")));
    }
    let p = Path::new(path);
    if !p.exists() {
        return Err(ExecError::Validation(format!("cwd does not exist: {path}")));
    }
    if !p.is_dir() {
        return Err(ExecError::Validation(format!("cwd is not a directory: {path}")));
    }
    Ok(())
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
