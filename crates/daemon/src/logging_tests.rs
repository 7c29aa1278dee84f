// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[yare::parameterized(
    default = { 0, "info" },
    debug   = { 1, "debug" },
    trace   = { 2, "trace" },
    capped  = { 9, "trace" },
)]
fn debug_count_maps_to_level(debug: u8, expected: &str) {
    assert_eq!(LEVELS[level_for_debug(debug)], expected);
}

#[test]
fn rotation_skips_taken_slots() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("x.tailstatd.log");
    std::fs::write(&log, "old").unwrap();
    std::fs::write(dir.path().join("x.tailstatd.log.000"), "older").unwrap();

    let dest = rotate_log(&log).unwrap();
    assert_eq!(dest, Some(dir.path().join("x.tailstatd.log.001")));
    assert!(!log.exists());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("x.tailstatd.log.001")).unwrap(),
        "old"
    );
}

#[test]
fn rotation_without_log_is_a_no_op() {
    let dir = tempdir().unwrap();
    assert_eq!(rotate_log(&dir.path().join("absent.log")).unwrap(), None);
}
