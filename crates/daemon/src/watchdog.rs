// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Starvation watchdog.
//!
//! Pending jobs older than the threshold, and running jobs far past their
//! declared walltime, are removed from the batch queue. Removals the queue
//! only acknowledges are counted in the persistent attempt store; after
//! [`FORCE_AFTER`] acknowledgements the removal is forced.

use tracing::{debug, info, warn};
use tsd_adapters::QueueManager;
use tsd_core::{format_elapsed, QueueId};
use tsd_storage::{RemovalAttempts, WorkflowState};

use crate::config::WatchdogConfig;

/// Acknowledged attempts after which removals are forced.
pub const FORCE_AFTER: u32 = 10;

/// Running jobs are never removed before this many seconds.
pub const RUNNING_FLOOR_SECS: i64 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Starvation {
    PendingWarn,
    PendingRemove,
    RunningWarn,
    RunningRemove,
}

impl Starvation {
    pub fn removes(&self) -> bool {
        matches!(self, Starvation::PendingRemove | Starvation::RunningRemove)
    }
}

/// A job the watchdog has an opinion about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub job_id: String,
    pub queue_id: Option<String>,
    /// Seconds in the pending or running set.
    pub age: i64,
    pub kind: Starvation,
}

/// Classify every pending and running entry at `now`, sorted by job id.
pub fn scan(state: &WorkflowState, config: &WatchdogConfig, now: i64) -> Vec<Finding> {
    if !config.enabled() {
        return Vec::new();
    }
    let threshold = config.threshold as i64;
    let mut findings = Vec::new();

    for (job_id, entry) in state.pending() {
        let age = now - entry.stamp;
        let kind = if age > threshold {
            Starvation::PendingRemove
        } else if age > threshold / 3 {
            Starvation::PendingWarn
        } else {
            continue;
        };
        findings.push(Finding {
            job_id: job_id.clone(),
            queue_id: entry.queue_id.clone(),
            age,
            kind,
        });
    }

    if config.lie_factor > 0.0 {
        for (job_id, entry) in state.running() {
            let Some(walltime) = entry.walltime else {
                continue;
            };
            let elapsed = now - entry.stamp;
            let limit = config.lie_factor * walltime as f64;
            let kind = if elapsed as f64 > limit && elapsed > RUNNING_FLOOR_SECS {
                Starvation::RunningRemove
            } else if elapsed as f64 > 0.75 * limit {
                Starvation::RunningWarn
            } else {
                continue;
            };
            findings.push(Finding {
                job_id: job_id.clone(),
                queue_id: entry.queue_id.clone(),
                age: elapsed,
                kind,
            });
        }
    }

    findings.sort_by(|a, b| a.job_id.cmp(&b.job_id));
    findings
}

/// Periodic driver around [`scan`] that owns the removal bookkeeping.
pub struct Watchdog<Q: QueueManager> {
    queue: Q,
    removals: RemovalAttempts,
    config: WatchdogConfig,
    next_due: i64,
}

impl<Q: QueueManager> Watchdog<Q> {
    /// The first check runs one interval after `now`.
    pub fn new(queue: Q, removals: RemovalAttempts, config: WatchdogConfig, now: i64) -> Self {
        let next_due = now + config.interval.as_secs() as i64;
        Self {
            queue,
            removals,
            config,
            next_due,
        }
    }

    pub fn is_due(&self, now: i64) -> bool {
        self.config.enabled() && now >= self.next_due
    }

    pub fn removals(&self) -> &RemovalAttempts {
        &self.removals
    }

    pub fn into_removals(self) -> RemovalAttempts {
        self.removals
    }

    /// Scan `state` and act on the findings.
    pub async fn check(&mut self, state: &WorkflowState, now: i64) -> Vec<Finding> {
        self.next_due = now + self.config.interval.as_secs() as i64;
        let findings = scan(state, &self.config, now);
        debug!(findings = findings.len(), "starvation check");

        for finding in &findings {
            let age = format_elapsed(finding.age.max(0) as u64);
            match finding.kind {
                Starvation::PendingWarn => {
                    warn!(job_id = %finding.job_id, %age, "job has been pending for a while")
                }
                Starvation::PendingRemove => {
                    warn!(job_id = %finding.job_id, %age, "job starved in pending state, removing")
                }
                Starvation::RunningWarn => {
                    warn!(job_id = %finding.job_id, %age, "job is nearing its walltime allowance")
                }
                Starvation::RunningRemove => {
                    warn!(job_id = %finding.job_id, %age, "job exceeded its walltime allowance, removing")
                }
            }
            if finding.kind.removes() {
                self.remove(&finding.job_id, finding.queue_id.as_deref()).await;
            }
        }
        findings
    }

    async fn remove(&mut self, job_id: &str, raw: Option<&str>) {
        let Some(raw) = raw else {
            warn!(job_id, "no queue id known, cannot remove");
            return;
        };
        let queue_id = match QueueId::parse(raw) {
            Ok(id) => id,
            Err(e) => {
                warn!(job_id, error = %e, "refusing to remove");
                return;
            }
        };

        let attempts = self.removals.get(queue_id.as_str());
        let force = attempts > FORCE_AFTER;
        let report = match self.queue.remove(&queue_id, force).await {
            Ok(report) => report,
            Err(e) => {
                warn!(job_id, queue_id = %queue_id, error = %e, "removal did not run");
                return;
            }
        };

        let bookkeeping = if report.already_marked {
            self.removals.increment(queue_id.as_str()).map(|n| {
                info!(job_id, queue_id = %queue_id, attempts = n, "removal still pending");
            })
        } else if report.success {
            self.removals.clear(queue_id.as_str())
        } else {
            warn!(job_id, queue_id = %queue_id, output = %report.output, "removal refused");
            Ok(())
        };
        if let Err(e) = bookkeeping {
            warn!(queue_id = %queue_id, error = %e, "failed to update removal store");
        }
    }
}

#[cfg(test)]
#[path = "watchdog_tests.rs"]
mod tests;
