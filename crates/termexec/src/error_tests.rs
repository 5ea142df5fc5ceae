// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn display_includes_the_message() {
    let err = ExecError::Validation("bad session name".into());
    assert_eq!(err.to_string(), "validation error: bad session name");
}

#[test]
fn timeout_has_a_fixed_message() {
    assert_eq!(ExecError::Timeout.to_string(), "operation timed out");
}
