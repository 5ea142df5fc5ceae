// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn list_dir_excludes_node_modules_and_git() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir(dir.path().join("node_modules")).expect("mkdir");
    std::fs::create_dir(dir.path().join(".git")).expect("mkdir");
    std::fs::write(dir.path().join("main.rs"), "fn main() {}").expect("write");

    let cwd = dir.path().to_string_lossy().into_owned();
    let entries = list_dir(&cwd, "").expect("list");
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert!(names.contains(&"main.rs"));
    assert!(!names.contains(&"node_modules"));
    assert!(!names.contains(&".git"));
}

#[test]
fn scoped_path_rejects_parent_escape() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cwd = dir.path().to_string_lossy().into_owned();
    let err = read_file(&cwd, "../../etc/passwd").expect_err("should reject");
    assert_eq!(err.code, crate::error::ErrorCode::Validation);
}

#[test]
fn read_file_rejects_binary_extension() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("icon.png"), [0u8, 1, 2]).expect("write");
    let cwd = dir.path().to_string_lossy().into_owned();
    let err = read_file(&cwd, "icon.png").expect_err("should reject");
    assert_eq!(err.code, crate::error::ErrorCode::Validation);
}

#[test]
fn read_file_rejects_oversized_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("big.txt"), vec![b'a'; (MAX_FILE_BYTES + 1) as usize]).expect("write");
    let cwd = dir.path().to_string_lossy().into_owned();
    let err = read_file(&cwd, "big.txt").expect_err("should reject");
    assert_eq!(err.code, crate::error::ErrorCode::Validation);
}

#[test]
fn read_file_returns_contents_for_a_normal_text_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("readme.md"), "hello").expect("write");
    let cwd = dir.path().to_string_lossy().into_owned();
    assert_eq!(read_file(&cwd, "readme.md").expect("read"), "hello");
}

#[test]
fn tree_respects_depth_cap_and_excludes() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir_all(dir.path().join("a/b/c")).expect("mkdir");
    std::fs::create_dir(dir.path().join("node_modules")).expect("mkdir");
    std::fs::write(dir.path().join("a/b/c/deep.txt"), "x").expect("write");

    let cwd = dir.path().to_string_lossy().into_owned();
    let root = tree(&cwd, "", 1).expect("tree");
    assert!(root.children.iter().any(|c| c.name == "a"));
    assert!(!root.children.iter().any(|c| c.name == "node_modules"));
    let a = root.children.iter().find(|c| c.name == "a").expect("a");
    assert!(a.children.is_empty(), "depth 1 should not recurse into a/b");
}
