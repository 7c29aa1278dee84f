// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Queue removal binary (default: `condor_rm` from `PATH`).
pub fn condor_rm_binary() -> String {
    std::env::var("TAILSTATD_CONDOR_RM")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "condor_rm".to_string())
}

/// Queue removal timeout (default: 60s).
pub fn queue_timeout() -> Duration {
    parse_duration_ms("TAILSTATD_QUEUE_TIMEOUT_MS").unwrap_or(crate::subprocess::QUEUE_COMMAND_TIMEOUT)
}
