// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

crate::define_id! {
    /// Test ID type for macro verification.
    pub struct TestId("test-");
}

#[test]
fn define_id_hash_map_lookup() {
    let id = TestId::from_string("test-k");
    let mut map = HashMap::new();
    map.insert(id.clone(), 42);
    assert_eq!(map.get("test-k"), Some(&42));
}

#[test]
fn define_id_new_has_prefix() {
    let id = TestId::new();
    assert!(id.as_str().starts_with("test-"));
}

#[test]
fn define_id_new_is_unique() {
    assert_ne!(TestId::new(), TestId::new());
}

#[test]
fn define_id_display_matches_as_str() {
    let id = TestId::from_string("test-abc");
    assert_eq!(id.to_string(), "test-abc");
}

#[test]
fn short_truncates_to_n_bytes() {
    assert_eq!(short("abcdefghijklmnop", 8), "abcdefgh");
}

#[test]
fn short_returns_full_when_shorter_than_n() {
    assert_eq!(short("abc", 8), "abc");
}

#[test]
fn short_returns_full_when_exact() {
    assert_eq!(short("abcdefgh", 8), "abcdefgh");
}
