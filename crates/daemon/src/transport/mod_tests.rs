// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::http::HeaderValue;

use super::is_loopback_origin;

#[test]
fn loopback_origins_are_recognized() {
    assert!(is_loopback_origin(&HeaderValue::from_static("http://localhost:3000")));
    assert!(is_loopback_origin(&HeaderValue::from_static("http://127.0.0.1:8080")));
    assert!(is_loopback_origin(&HeaderValue::from_static("http://[::1]:9000")));
}

#[test]
fn non_loopback_origin_is_rejected() {
    assert!(!is_loopback_origin(&HeaderValue::from_static("https://example.com")));
}
