// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-browsing endpoints are scoped to a session's `cwd`: every path is
//! normalized and checked against escaping the root before any syscall
//! touches it, mirroring the validation discipline the terminal executor
//! applies to its own arguments.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::error::ApiError;

const EXCLUDED_DIRS: &[&str] = &["node_modules", ".git"];
const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "pdf", "zip", "tar", "gz", "bz2", "7z",
    "exe", "so", "dylib", "dll", "bin", "woff", "woff2", "ttf", "eot", "otf", "mp3", "mp4", "mov",
    "wav", "class", "jar", "wasm",
];
const MAX_FILE_BYTES: u64 = 1024 * 1024;
const MAX_TREE_DEPTH: u32 = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub is_dir: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeEntry {
    pub name: String,
    pub path: String,
    pub is_dir: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeEntry>,
}

/// Collapse `.`/`..` components lexically, without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolve a caller-supplied relative path against `cwd`, rejecting anything
/// that normalizes outside of it.
fn scoped_path(cwd: &str, rel_path: &str) -> Result<PathBuf, ApiError> {
    let base = normalize(Path::new(cwd));
    let joined = base.join(rel_path.trim_start_matches('/'));
    let resolved = normalize(&joined);
    if resolved != base && !resolved.starts_with(&base) {
        return Err(ApiError::validation("path escapes session cwd"));
    }
    Ok(resolved)
}

fn relative_to(path: &Path, cwd: &str) -> String {
    path.strip_prefix(normalize(Path::new(cwd))).unwrap_or(path).to_string_lossy().into_owned()
}

pub fn list_dir(cwd: &str, rel_path: &str) -> Result<Vec<FileEntry>, ApiError> {
    let dir = scoped_path(cwd, rel_path)?;
    if !dir.is_dir() {
        return Err(ApiError::validation("not a directory"));
    }
    let read = std::fs::read_dir(&dir).map_err(|e| ApiError::internal(e.to_string()))?;
    let mut entries = Vec::new();
    for entry in read {
        let entry = entry.map_err(|e| ApiError::internal(e.to_string()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if EXCLUDED_DIRS.contains(&name.as_str()) {
            continue;
        }
        let path = entry.path();
        entries.push(FileEntry { name, path: relative_to(&path, cwd), is_dir: path.is_dir() });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

fn is_binary_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| BINARY_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

pub fn read_file(cwd: &str, rel_path: &str) -> Result<String, ApiError> {
    let file = scoped_path(cwd, rel_path)?;
    if is_binary_extension(&file) {
        return Err(ApiError::validation("refusing to read a binary file"));
    }
    let meta = std::fs::metadata(&file).map_err(|_| ApiError::not_found("file not found"))?;
    if !meta.is_file() {
        return Err(ApiError::validation("not a file"));
    }
    if meta.len() > MAX_FILE_BYTES {
        return Err(ApiError::validation("file exceeds the 1 MB read limit"));
    }
    std::fs::read_to_string(&file).map_err(|e| ApiError::validation(format!("not valid utf-8: {e}")))
}

pub fn tree(cwd: &str, rel_path: &str, depth: u32) -> Result<TreeEntry, ApiError> {
    let root = scoped_path(cwd, rel_path)?;
    build_tree(&root, cwd, depth.min(MAX_TREE_DEPTH))
}

fn build_tree(path: &Path, cwd: &str, depth: u32) -> Result<TreeEntry, ApiError> {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| ".".to_owned());
    let is_dir = path.is_dir();
    let mut children = Vec::new();
    if is_dir && depth > 0 {
        let read = std::fs::read_dir(path).map_err(|e| ApiError::internal(e.to_string()))?;
        let mut listed: Vec<_> = read.filter_map(|e| e.ok()).collect();
        listed.sort_by_key(|e| e.file_name());
        for entry in listed {
            let child_name = entry.file_name().to_string_lossy().into_owned();
            if EXCLUDED_DIRS.contains(&child_name.as_str()) {
                continue;
            }
            children.push(build_tree(&entry.path(), cwd, depth - 1)?);
        }
    }
    Ok(TreeEntry { name, path: relative_to(path, cwd), is_dir, children })
}

#[cfg(test)]
#[path = "fsops_tests.rs"]
mod tests;
