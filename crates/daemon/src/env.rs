// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::time::Duration;

/// Length of one backoff "second" (default: 1s).
///
/// Lowering it lets tests walk the idle schedule quickly.
pub fn backoff_unit() -> Duration {
    std::env::var("TAILSTATD_BACKOFF_UNIT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(1))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
