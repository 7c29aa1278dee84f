// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-site job counters and the pending wait-time histogram.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::event::{is_pending, is_running, names};

/// One-letter job state as seen from a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SiteState {
    Pending,
    Running,
    Other,
    Succeeded,
    Failed,
}

impl SiteState {
    pub const ALL: [SiteState; 5] = [
        SiteState::Pending,
        SiteState::Running,
        SiteState::Other,
        SiteState::Succeeded,
        SiteState::Failed,
    ];

    pub fn from_event(kind: &str) -> Self {
        if is_pending(kind) {
            SiteState::Pending
        } else if is_running(kind) {
            SiteState::Running
        } else if kind == names::POST_SCRIPT_SUCCESS {
            SiteState::Succeeded
        } else if kind == names::POST_SCRIPT_FAILURE {
            SiteState::Failed
        } else {
            SiteState::Other
        }
    }

    pub fn letter(&self) -> char {
        match self {
            SiteState::Pending => 'P',
            SiteState::Running => 'R',
            SiteState::Other => 'O',
            SiteState::Succeeded => 'S',
            SiteState::Failed => 'F',
        }
    }

    /// Post-script outcomes are never decremented once counted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SiteState::Succeeded | SiteState::Failed)
    }

    fn index(&self) -> usize {
        match self {
            SiteState::Pending => 0,
            SiteState::Running => 1,
            SiteState::Other => 2,
            SiteState::Succeeded => 3,
            SiteState::Failed => 4,
        }
    }
}

impl fmt::Display for SiteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Counters and timestamps for one site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteInfo {
    counts: [u64; 5],
    jobs: HashMap<String, SiteState>,
    /// Last update of any job on this site.
    pub mtime: i64,
    pub mtime_succ: Option<i64>,
    pub mtime_fail: Option<i64>,
}

impl SiteInfo {
    pub fn count(&self, state: SiteState) -> u64 {
        self.counts[state.index()]
    }

    pub fn job_state(&self, job_id: &str) -> Option<SiteState> {
        self.jobs.get(job_id).copied()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Move `job_id` into `state`: the old counter is decremented unless it
    /// was terminal, the new one incremented. Re-entering the same state
    /// only refreshes timestamps.
    pub fn transition(&mut self, job_id: &str, state: SiteState, stamp: i64) {
        match self.jobs.get(job_id).copied() {
            Some(old) if old == state => {}
            Some(old) => {
                if !old.is_terminal() {
                    let slot = &mut self.counts[old.index()];
                    *slot = slot.saturating_sub(1);
                }
                self.counts[state.index()] += 1;
            }
            None => self.counts[state.index()] += 1,
        }

        match state {
            SiteState::Succeeded => self.mtime_succ = Some(stamp),
            SiteState::Failed => self.mtime_fail = Some(stamp),
            _ => {}
        }
        self.jobs.insert(job_id.to_string(), state);
        self.mtime = stamp;
    }
}

/// Width of a histogram bucket in seconds.
pub const BUCKET_SECS: i64 = 60;

/// Samples aggregated into one minute bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaitBucket {
    pub count: u64,
    /// Sum of wait durations in seconds.
    pub sum: u64,
}

impl WaitBucket {
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            self.sum as f64
        } else {
            self.sum as f64 / self.count as f64
        }
    }
}

/// site → minute bucket → wait samples. Grows without eviction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitingHistogram {
    sites: HashMap<String, BTreeMap<i64, WaitBucket>>,
}

impl WaitingHistogram {
    /// Record that a job on `site` left pending at `now` after entering it
    /// at `since`. Returns the updated bucket.
    pub fn aggregate(&mut self, site: &str, now: i64, since: i64) -> WaitBucket {
        let bucket = now.div_euclid(BUCKET_SECS);
        let diff = (now - since).unsigned_abs();
        let entry = self
            .sites
            .entry(site.to_string())
            .or_default()
            .entry(bucket)
            .or_default();
        entry.count += 1;
        entry.sum += diff;
        *entry
    }

    pub fn bucket(&self, site: &str, bucket: i64) -> Option<WaitBucket> {
        self.sites.get(site)?.get(&bucket).copied()
    }

    /// Buckets for `site`, newest first, as `(bucket start epoch, samples)`.
    pub fn rows(&self, site: &str) -> Vec<(i64, WaitBucket)> {
        self.sites
            .get(site)
            .map(|buckets| {
                buckets
                    .iter()
                    .rev()
                    .map(|(bucket, samples)| (bucket * BUCKET_SECS, *samples))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "site_tests.rs"]
mod tests;
