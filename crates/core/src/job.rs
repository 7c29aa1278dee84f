// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DAG node records and the workflow that owns them.

use indexmap::IndexMap;

use crate::event::{names, JobEvent};

/// Planning data read from a job's submit description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobPlan {
    /// Declared walltime in minutes.
    pub walltime_minutes: Option<u64>,
    pub site: Option<String>,
    /// Job class name (`compute`, `stage-in`, ...).
    pub job_type: Option<String>,
    pub transformation: Option<String>,
}

impl JobPlan {
    pub fn walltime_secs(&self) -> Option<u64> {
        self.walltime_minutes.map(|m| m * 60)
    }
}

/// Start/end bookkeeping for a PRE or POST script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptRun {
    pub started: Option<i64>,
    pub finished: Option<i64>,
    pub exit_code: Option<i32>,
}

impl ScriptRun {
    /// Seconds from start to finish, when both were seen.
    pub fn duration(&self) -> Option<i64> {
        Some(self.finished? - self.started?)
    }
}

/// One DAG node as tracked by the daemon. Never removed once registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub job_id: String,
    /// Registration order within the workflow, starting at 1.
    pub submit_seq: u32,
    pub state: String,
    pub stamp: i64,
    pub queue_id: Option<String>,
    pub site: Option<String>,
    /// Declared walltime in seconds.
    pub walltime: Option<u64>,
    pub job_type: Option<String>,
    pub transformation: Option<String>,
    pub pre_script: ScriptRun,
    pub post_script: ScriptRun,
    pub main_job_start: Option<i64>,
    pub main_job_exit_code: Option<i32>,
}

impl Job {
    pub fn new(job_id: impl Into<String>, submit_seq: u32, state: impl Into<String>, stamp: i64) -> Self {
        Self {
            job_id: job_id.into(),
            submit_seq,
            state: state.into(),
            stamp,
            queue_id: None,
            site: None,
            walltime: None,
            job_type: None,
            transformation: None,
            pre_script: ScriptRun::default(),
            post_script: ScriptRun::default(),
            main_job_start: None,
            main_job_exit_code: None,
        }
    }

    /// Seconds the main job ran when it ended at `stamp`.
    pub fn main_job_runtime(&self, stamp: i64) -> Option<i64> {
        self.main_job_start.map(|start| stamp - start)
    }

    /// Record a new state and the side data the event implies.
    pub fn set_state(&mut self, event: &JobEvent, stamp: i64) {
        self.state = event.kind.clone();
        self.stamp = stamp;

        match event.kind.as_str() {
            names::PRE_SCRIPT_STARTED => self.pre_script.started = Some(stamp),
            names::PRE_SCRIPT_SUCCESS | names::PRE_SCRIPT_FAILURE => {
                self.pre_script.finished = Some(stamp);
                self.pre_script.exit_code = event.status;
            }
            names::POST_SCRIPT_STARTED => self.post_script.started = Some(stamp),
            names::POST_SCRIPT_SUCCESS | names::POST_SCRIPT_FAILURE => {
                self.post_script.finished = Some(stamp);
                self.post_script.exit_code = event.status;
            }
            names::SUBMIT => self.main_job_start = Some(stamp),
            names::JOB_SUCCESS | names::JOB_FAILURE => self.main_job_exit_code = event.status,
            _ => {}
        }
    }
}

/// Outcome of registering a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    New(u32),
    Existing(u32),
}

impl Registration {
    pub fn seq(&self) -> u32 {
        match self {
            Registration::New(seq) | Registration::Existing(seq) => *seq,
        }
    }
}

/// All jobs of one DAGMan run.
#[derive(Debug, Clone, Default)]
pub struct Workflow {
    pub id: String,
    jobs: IndexMap<String, Job>,
    /// Last queue id seen per job, kept even after the job moves on.
    queue_ids: IndexMap<String, String>,
}

impl Workflow {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            jobs: IndexMap::new(),
            queue_ids: IndexMap::new(),
        }
    }

    /// Register `job_id` on first sight; an existing job keeps its sequence
    /// number. A queue id, when given, is remembered in both cases.
    pub fn register(
        &mut self,
        job_id: &str,
        state: &str,
        stamp: i64,
        queue_id: Option<&str>,
    ) -> Registration {
        if let Some(qid) = queue_id {
            self.queue_ids.insert(job_id.to_string(), qid.to_string());
        }

        let next_seq = self.jobs.len() as u32 + 1;
        let registration = match self.jobs.get(job_id).map(|job| job.submit_seq) {
            Some(seq) => Registration::Existing(seq),
            None => {
                self.jobs
                    .insert(job_id.to_string(), Job::new(job_id, next_seq, state, stamp));
                Registration::New(next_seq)
            }
        };
        if let (Some(job), Some(qid)) = (self.jobs.get_mut(job_id), queue_id) {
            job.queue_id = Some(qid.to_string());
        }
        registration
    }

    pub fn job(&self, job_id: &str) -> Option<&Job> {
        self.jobs.get(job_id)
    }

    pub fn job_mut(&mut self, job_id: &str) -> Option<&mut Job> {
        self.jobs.get_mut(job_id)
    }

    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn last_queue_id(&self, job_id: &str) -> Option<&str> {
        self.queue_ids.get(job_id).map(String::as_str)
    }

    pub fn remember_queue_id(&mut self, job_id: &str, queue_id: &str) {
        self.queue_ids
            .insert(job_id.to_string(), queue_id.to_string());
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
