// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory workflow state driven by job events.
//!
//! `WorkflowState` owns every map the daemon maintains: the workflow's jobs,
//! the last jobstate record per job, the pending and running sets, per-site
//! counters and the pending wait histogram. It is owned by the event loop
//! and mutated only through [`WorkflowState::record_event`].

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, info, trace, warn};
use tsd_core::{
    is_pending, is_running, is_unsubmitted, names, JobEvent, JobPlan, JobstateRecord,
    Registration, SiteInfo, SiteState, WaitingHistogram, Workflow,
};

use crate::jobstate_log::JobstateSink;

/// When a job entered the pending or running set and what was known then.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub stamp: i64,
    pub queue_id: Option<String>,
    /// Declared walltime in seconds.
    pub walltime: Option<u64>,
    pub site: Option<String>,
}

pub type PendingEntry = QueueEntry;
pub type RunningEntry = QueueEntry;

/// What [`WorkflowState::record_event`] did with one event.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub record: JobstateRecord,
    /// Set for events that register jobs (`PRE_SCRIPT_STARTED`, `SUBMIT`).
    pub registration: Option<Registration>,
    /// Script failure with exit 42 or after exhausted retries.
    pub permanent_failure: bool,
}

#[derive(Debug, Default)]
pub struct WorkflowState {
    pub workflow: Workflow,
    jobstate: IndexMap<String, JobstateRecord>,
    pending: HashMap<String, PendingEntry>,
    running: HashMap<String, RunningEntry>,
    sites: IndexMap<String, SiteInfo>,
    waiting: WaitingHistogram,
    /// Planning data cached from submit files, cleared on replanning.
    plans: HashMap<String, JobPlan>,
    /// Jobs whose last retry was used up, with the retry count.
    retry_flags: HashMap<String, u32>,
    /// POST script success time per job.
    done: IndexMap<String, i64>,
    seen: HashMap<String, u64>,
}

impl WorkflowState {
    pub fn new(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow: Workflow::new(workflow_id),
            ..Self::default()
        }
    }

    /// Apply one job event.
    ///
    /// `plan` is the submit-file lookup for `SUBMIT` events and is ignored
    /// for every other kind. The resulting record is appended to `sink`; a
    /// write failure is logged and does not abort the event.
    pub fn record_event(
        &mut self,
        stamp: i64,
        event: &JobEvent,
        plan: Option<JobPlan>,
        sink: &mut impl JobstateSink,
    ) -> Recorded {
        let job_id = event.job_id.as_str();
        let kind = event.kind.as_str();

        if is_unsubmitted(kind) && self.plans.remove(job_id).is_some() {
            debug!(job_id, kind, "clearing cached site and walltime");
        }

        let registration = self.register(stamp, event, plan);

        let cached = self.plans.get(job_id);
        let site = cached.and_then(|p| p.site.clone());
        let walltime = cached.and_then(JobPlan::walltime_secs);

        if let Some(qid) = &event.queue_id {
            self.workflow.remember_queue_id(job_id, qid);
        }
        let queue_id = event
            .queue_id
            .clone()
            .or_else(|| self.workflow.last_queue_id(job_id).map(str::to_string));

        match self.workflow.job_mut(job_id) {
            Some(job) => {
                job.set_state(event, stamp);
                if site.is_some() {
                    job.site.clone_from(&site);
                }
                if walltime.is_some() {
                    job.walltime = walltime;
                }
            }
            None => warn!(job_id, kind, "cannot find job, state not updated"),
        }

        let entry = || QueueEntry {
            stamp,
            queue_id: queue_id.clone(),
            walltime,
            site: site.clone(),
        };

        if is_pending(kind) {
            if self.pending.contains_key(job_id) {
                trace!(job_id, kind, "remains pending");
            } else {
                self.pending.insert(job_id.to_string(), entry());
            }
        } else {
            let was_pending = self
                .jobstate
                .get(job_id)
                .is_some_and(|last| is_pending(&last.event));
            if let Some(entry) = self.pending.remove(job_id) {
                if was_pending {
                    self.aggregate(site.as_deref(), stamp, &entry);
                }
            }
        }

        if is_running(kind) {
            if self.running.contains_key(job_id) {
                trace!(job_id, kind, "remains running");
            } else {
                self.running.insert(job_id.to_string(), entry());
            }
        } else {
            self.running.remove(job_id);
        }

        let record = JobstateRecord {
            stamp,
            job_id: job_id.to_string(),
            event: kind.to_string(),
            addon: event.addon(),
            site: site.clone(),
            walltime,
        };
        trace!(%record, "new state");
        if let Err(e) = sink.append(&record) {
            warn!(job_id, error = %e, "failed to append jobstate record");
        }
        self.jobstate.insert(job_id.to_string(), record.clone());

        if let Some(site) = &site {
            self.sites.entry(site.clone()).or_default().transition(
                job_id,
                SiteState::from_event(kind),
                stamp,
            );
        }

        let permanent_failure = self.classify_outcome(stamp, event);

        *self.seen.entry(job_id.to_string()).or_insert(0) += 1;

        Recorded {
            record,
            registration,
            permanent_failure,
        }
    }

    /// Remember that `job_id` used its last retry.
    pub fn flag_retries(&mut self, job_id: &str, retries: u32) {
        debug!(job_id, retries, "retries exhausted");
        self.retry_flags.insert(job_id.to_string(), retries);
    }

    pub fn retry_flag(&self, job_id: &str) -> Option<u32> {
        self.retry_flags.get(job_id).copied()
    }

    pub fn job_record(&self, job_id: &str) -> Option<&JobstateRecord> {
        self.jobstate.get(job_id)
    }

    /// Last record of every job, in first-seen order.
    pub fn job_records(&self) -> impl Iterator<Item = (&str, &JobstateRecord)> {
        self.jobstate.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn pending(&self) -> &HashMap<String, PendingEntry> {
        &self.pending
    }

    pub fn running(&self) -> &HashMap<String, RunningEntry> {
        &self.running
    }

    pub fn site(&self, site: &str) -> Option<&SiteInfo> {
        self.sites.get(site)
    }

    /// Sites in first-seen order.
    pub fn sites(&self) -> impl Iterator<Item = (&str, &SiteInfo)> {
        self.sites.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn waiting(&self) -> &WaitingHistogram {
        &self.waiting
    }

    pub fn done(&self) -> &IndexMap<String, i64> {
        &self.done
    }

    pub fn seen(&self, job_id: &str) -> u64 {
        self.seen.get(job_id).copied().unwrap_or(0)
    }

    fn register(
        &mut self,
        stamp: i64,
        event: &JobEvent,
        plan: Option<JobPlan>,
    ) -> Option<Registration> {
        let job_id = event.job_id.as_str();
        let kind = event.kind.as_str();

        if kind != names::PRE_SCRIPT_STARTED && kind != names::SUBMIT {
            return None;
        }

        let previous = self.workflow.job(job_id).map(|job| job.state.clone());
        let registration =
            self.workflow
                .register(job_id, kind, stamp, event.queue_id.as_deref());
        if let Registration::Existing(seq) = registration {
            // SUBMIT after a PRE script is the normal path for a job with one
            let after_pre_script = kind == names::SUBMIT
                && previous
                    .as_deref()
                    .is_some_and(|state| state.starts_with("PRE_SCRIPT_"));
            if !after_pre_script {
                warn!(job_id, seq, kind, "job registered twice");
            }
        }

        if kind == names::SUBMIT {
            let plan = plan.unwrap_or_default();
            match plan.walltime_secs() {
                Some(secs) => info!(job_id, walltime = secs, "job requests walltime"),
                None => debug!(job_id, "job does not request a walltime"),
            }
            match &plan.site {
                Some(site) => info!(job_id, site = %site, "job is planned for site"),
                None => info!(job_id, "job does not have site information"),
            }
            if let Some(job) = self.workflow.job_mut(job_id) {
                if plan.job_type.is_some() {
                    job.job_type.clone_from(&plan.job_type);
                }
                if plan.transformation.is_some() {
                    job.transformation.clone_from(&plan.transformation);
                }
            }
            self.plans.insert(job_id.to_string(), plan);
        }

        Some(registration)
    }

    fn aggregate(&mut self, site: Option<&str>, stamp: i64, entry: &PendingEntry) {
        let Some(site) = site else {
            return;
        };
        let bucket = self.waiting.aggregate(site, stamp, entry.stamp);
        trace!(
            site,
            slot = stamp.div_euclid(tsd_core::BUCKET_SECS),
            count = bucket.count,
            mean = bucket.mean(),
            "aggregated pending wait"
        );
    }

    /// Track POST successes and flag permanent script failures.
    fn classify_outcome(&mut self, stamp: i64, event: &JobEvent) -> bool {
        let job_id = event.job_id.as_str();
        match event.kind.as_str() {
            names::POST_SCRIPT_SUCCESS => {
                self.done.insert(job_id.to_string(), stamp);
                false
            }
            names::PRE_SCRIPT_FAILURE | names::POST_SCRIPT_FAILURE => {
                let flagged = self.retry_flags.get(job_id).is_some_and(|n| *n > 0);
                let permanent = event.status == Some(42) || flagged;
                if permanent {
                    warn!(job_id, status = ?event.status, "detected permanent failure");
                    if self.done.is_empty() {
                        warn!("no successful jobs so far");
                    }
                }
                permanent
            }
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
