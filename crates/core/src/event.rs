// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed events extracted from DAGMan out-file lines.

use std::fmt;

/// Event names used by the state machine.
///
/// DAGMan reports user-log events as `ULOG_<NAME>`; the names here are the
/// `<NAME>` part plus the synthetic script and job summary events.
pub mod names {
    pub const SUBMIT: &str = "SUBMIT";
    pub const EXECUTE: &str = "EXECUTE";
    pub const GLOBUS_SUBMIT: &str = "GLOBUS_SUBMIT";
    pub const GRID_SUBMIT: &str = "GRID_SUBMIT";
    pub const GLOBUS_RESOURCE_DOWN: &str = "GLOBUS_RESOURCE_DOWN";
    pub const GLOBUS_RESOURCE_UP: &str = "GLOBUS_RESOURCE_UP";
    pub const JOB_SUSPENDED: &str = "JOB_SUSPENDED";
    pub const JOB_UNSUSPENDED: &str = "JOB_UNSUSPENDED";
    pub const JOB_TERMINATED: &str = "JOB_TERMINATED";
    pub const UN_READY: &str = "UN_READY";
    pub const PRE_SCRIPT_STARTED: &str = "PRE_SCRIPT_STARTED";
    pub const PRE_SCRIPT_SUCCESS: &str = "PRE_SCRIPT_SUCCESS";
    pub const PRE_SCRIPT_FAILURE: &str = "PRE_SCRIPT_FAILURE";
    pub const POST_SCRIPT_STARTED: &str = "POST_SCRIPT_STARTED";
    pub const POST_SCRIPT_SUCCESS: &str = "POST_SCRIPT_SUCCESS";
    pub const POST_SCRIPT_FAILURE: &str = "POST_SCRIPT_FAILURE";
    pub const JOB_SUCCESS: &str = "JOB_SUCCESS";
    pub const JOB_FAILURE: &str = "JOB_FAILURE";
}

/// Remote submission accepted but throttled before execution.
///
/// A local `SUBMIT` is deliberately not part of this group.
pub const PENDING_EVENTS: &[&str] = &[names::GLOBUS_SUBMIT, names::GRID_SUBMIT];

/// Executing remotely, including suspension and resource flaps.
pub const RUNNING_EVENTS: &[&str] = &[
    names::EXECUTE,
    names::GLOBUS_RESOURCE_DOWN,
    names::GLOBUS_RESOURCE_UP,
    names::JOB_SUSPENDED,
    names::JOB_UNSUSPENDED,
];

/// Events that invalidate cached planning data (site, walltime).
pub const UNSUBMITTED_EVENTS: &[&str] = &[
    names::UN_READY,
    names::PRE_SCRIPT_STARTED,
    names::PRE_SCRIPT_SUCCESS,
    names::PRE_SCRIPT_FAILURE,
];

pub fn is_pending(kind: &str) -> bool {
    PENDING_EVENTS.contains(&kind)
}

pub fn is_running(kind: &str) -> bool {
    RUNNING_EVENTS.contains(&kind)
}

pub fn is_unsubmitted(kind: &str) -> bool {
    UNSUBMITTED_EVENTS.contains(&kind)
}

/// Which DAGMan script a script event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Pre,
    Post,
}

impl ScriptKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PRE" => Some(ScriptKind::Pre),
            "POST" => Some(ScriptKind::Post),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptKind::Pre => "PRE",
            ScriptKind::Post => "POST",
        }
    }

    pub fn started(&self) -> &'static str {
        match self {
            ScriptKind::Pre => names::PRE_SCRIPT_STARTED,
            ScriptKind::Post => names::POST_SCRIPT_STARTED,
        }
    }

    pub fn success(&self) -> &'static str {
        match self {
            ScriptKind::Pre => names::PRE_SCRIPT_SUCCESS,
            ScriptKind::Post => names::POST_SCRIPT_SUCCESS,
        }
    }

    pub fn failure(&self) -> &'static str {
        match self {
            ScriptKind::Pre => names::PRE_SCRIPT_FAILURE,
            ScriptKind::Post => names::POST_SCRIPT_FAILURE,
        }
    }
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state change for one DAG node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEvent {
    pub job_id: String,
    pub kind: String,
    /// Condor `cluster.proc` identifier, when the line carried one.
    pub queue_id: Option<String>,
    /// Exit status for script and job summary events.
    pub status: Option<i32>,
}

impl JobEvent {
    pub fn new(job_id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            kind: kind.into(),
            queue_id: None,
            status: None,
        }
    }

    pub fn with_queue_id(mut self, queue_id: impl Into<String>) -> Self {
        self.queue_id = Some(queue_id.into());
        self
    }

    pub fn with_status(mut self, status: i32) -> Self {
        self.status = Some(status);
        self
    }

    /// Third column of a jobstate record: exit status, else queue id.
    pub fn addon(&self) -> Option<String> {
        self.status
            .map(|s| s.to_string())
            .or_else(|| self.queue_id.clone())
    }
}

/// Everything the extractor can recognize on a timestamped line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    Job(JobEvent),
    /// `Retrying node X (retry #N of N)`: last retry used up.
    RetryExhausted { job_id: String, retries: u32 },
    DagmanFinished { status: i32 },
    DagmanPid { pid: u32 },
    CondorVersion { version: String, major: String },
    /// Location of the Condor common user log.
    CondorLog { path: String },
    /// Marker announcing multi-line user log file listings.
    MultilineFiles,
}

impl LogEvent {
    pub fn name(&self) -> &str {
        match self {
            LogEvent::Job(job) => &job.kind,
            LogEvent::RetryExhausted { .. } => "retry_exhausted",
            LogEvent::DagmanFinished { .. } => "dagman_finished",
            LogEvent::DagmanPid { .. } => "dagman_pid",
            LogEvent::CondorVersion { .. } => "condor_version",
            LogEvent::CondorLog { .. } => "condor_log",
            LogEvent::MultilineFiles => "multiline_files",
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
