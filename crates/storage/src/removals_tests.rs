// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn counters_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("remove.json");

    let mut store = RemovalAttempts::open(&path).unwrap();
    assert_eq!(store.increment("12.0").unwrap(), 1);
    assert_eq!(store.increment("12.0").unwrap(), 2);
    assert_eq!(store.increment("13.0").unwrap(), 1);
    drop(store);

    let store = RemovalAttempts::open(&path).unwrap();
    assert_eq!(store.get("12.0"), 2);
    assert_eq!(store.get("13.0"), 1);
    assert_eq!(store.get("14.0"), 0);
}

#[test]
fn clear_removes_entry_persistently() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("remove.json");

    let mut store = RemovalAttempts::open(&path).unwrap();
    store.increment("12.0").unwrap();
    store.clear("12.0").unwrap();
    store.clear("never-seen").unwrap();
    assert!(store.is_empty());
    drop(store);

    assert_eq!(RemovalAttempts::open(&path).unwrap().get("12.0"), 0);
}

#[test]
fn open_creates_file_and_destroy_removes_it() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("remove.json");

    let store = RemovalAttempts::open(&path).unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("tmp").exists());

    store.destroy().unwrap();
    assert!(!path.exists());
}

#[test]
fn corrupt_store_is_moved_aside() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("remove.json");
    std::fs::write(&path, b"{not json").unwrap();

    let store = RemovalAttempts::open(&path).unwrap();
    assert!(store.is_empty());
    assert!(path.with_extension("bak").exists());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
}

#[test]
fn backups_rotate() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("remove.json");

    for _ in 0..2 {
        std::fs::write(&path, b"garbage").unwrap();
        RemovalAttempts::open(&path).unwrap();
    }
    assert!(path.with_extension("bak").exists());
    assert!(path.with_extension("bak.2").exists());
}
