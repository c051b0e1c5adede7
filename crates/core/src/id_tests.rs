// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

crate::define_id! {
    /// Test ID type for macro verification.
    pub struct TestId("tst_");
}

#[test]
fn new_ids_are_prefixed_and_unique() {
    let a = TestId::new();
    let b = TestId::new();
    assert!(a.as_str().starts_with("tst_"));
    assert_ne!(a, b);
}

#[test]
fn from_string_round_trips_through_display() {
    let id = TestId::from_string("tst_abc123");
    assert_eq!(id.to_string(), "tst_abc123");
    assert_eq!(id.suffix(), "abc123");
}

#[test]
fn hash_map_lookup_by_borrowed_str() {
    let mut map = HashMap::new();
    map.insert(TestId::from_string("tst_k"), 42);
    assert_eq!(map.get("tst_k"), Some(&42));
}

#[test]
fn short_truncates_suffix() {
    let id = TestId::from_string("tst_abcdefghijklmnop");
    assert_eq!(id.short(4), "abcd");
}

#[test]
fn short_fn_on_str() {
    let s = "abcdefghijklmnop";
    assert_eq!(short(s, 8), "abcdefgh");
    assert_eq!(short(s, 100), s);
    assert_eq!(short("abc", 8), "abc");
}

#[test]
#[should_panic]
fn new_panics_debug_assert_when_oversized() {
    // Exercises the debug_assert guard in IdBuf::new; only fires in debug builds.
    IdBuf::new(&"x".repeat(ID_MAX_LEN + 1));
}
