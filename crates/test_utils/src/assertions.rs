//! Custom Test Assertions
//!
//! Assertion helpers that explain failures in ledger terms.

use std::collections::BTreeMap;
use std::fmt::Debug;

use core_kernel::{Classify, ErrorKind};

/// Asserts that `result` failed with an error of `expected` kind
///
/// # Panics
///
/// Panics if `result` is `Ok` or fails with a different kind
pub fn assert_error_kind<T: Debug, E: Classify + Debug>(result: &Result<T, E>, expected: ErrorKind) {
    match result {
        Ok(value) => panic!("Expected {} error, got Ok({:?})", expected, value),
        Err(e) => assert_eq!(
            e.kind(),
            expected,
            "Expected {} error, got {} ({:?})",
            expected,
            e.kind(),
            e
        ),
    }
}

/// Asserts that two world-state snapshots are identical, naming the
/// first key that differs
pub fn assert_world_state_unchanged(
    before: &BTreeMap<String, Vec<u8>>,
    after: &BTreeMap<String, Vec<u8>>,
) {
    for (key, value) in before {
        match after.get(key) {
            None => panic!("Key {:?} was removed", key),
            Some(now) if now != value => panic!(
                "Key {:?} changed from {} to {}",
                key,
                String::from_utf8_lossy(value),
                String::from_utf8_lossy(now)
            ),
            Some(_) => {}
        }
    }
    if let Some(key) = after.keys().find(|k| !before.contains_key(*k)) {
        panic!("Key {:?} was added", key);
    }
}
