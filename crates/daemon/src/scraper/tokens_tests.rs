// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn extracts_plain_integer_token_count() {
    assert_eq!(extract_latest("some output\n↓ 1234 tokens\nmore"), Some(1234));
}

#[test]
fn extracts_kilo_suffixed_token_count() {
    assert_eq!(extract_latest("↓ 12.3k tokens"), Some(12300));
}

#[test]
fn takes_the_maximum_when_multiple_markers_present() {
    assert_eq!(extract_latest("↓ 100 tokens\n...\n↓ 9.5k tokens"), Some(9500));
}

#[test]
fn absent_marker_yields_none() {
    assert_eq!(extract_latest("nothing relevant here"), None);
}

#[test]
fn higher_reading_extends_cumulative() {
    let mut state = SessionTokenData::default();
    apply_reading(&mut state, 100, 1);
    apply_reading(&mut state, 150, 2);
    assert_eq!(state.cumulative, 150);
    assert_eq!(state.last_seen, 150);
}

#[test]
fn lower_nonzero_reading_resets_last_seen_without_changing_cumulative() {
    let mut state = SessionTokenData::default();
    apply_reading(&mut state, 500, 1);
    assert_eq!(state.cumulative, 500);
    apply_reading(&mut state, 50, 2);
    assert_eq!(state.cumulative, 500);
    assert_eq!(state.last_seen, 50);
}

#[test]
fn digest_cache_detects_unchanged_tail() {
    let mut cache = DigestCache::new();
    assert!(cache.changed("s1", "same output"));
    assert!(!cache.changed("s1", "same output"));
    assert!(cache.changed("s1", "different output"));
}
