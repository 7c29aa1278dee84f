// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lines of the canonical jobstate log.

use std::fmt;

/// One job state change, as appended to `jobstate.log`.
///
/// Renders as `<stamp> <job> <event> <addon|-> <site|-> <walltime|->`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobstateRecord {
    pub stamp: i64,
    pub job_id: String,
    pub event: String,
    pub addon: Option<String>,
    pub site: Option<String>,
    /// Declared walltime in seconds.
    pub walltime: Option<u64>,
}

fn or_dash<T: fmt::Display>(value: &Option<T>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Some(v) => write!(f, " {v}"),
        None => f.write_str(" -"),
    }
}

impl JobstateRecord {
    /// The record without its leading job id, as served by the `job`
    /// resource: `<stamp> <event> <addon|-> <site|-> <walltime|->`.
    pub fn fields(&self) -> RecordFields<'_> {
        RecordFields(self)
    }
}

impl fmt::Display for JobstateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.stamp, self.job_id)?;
        write!(f, " {}", self.event)?;
        or_dash(&self.addon, f)?;
        or_dash(&self.site, f)?;
        or_dash(&self.walltime, f)
    }
}

pub struct RecordFields<'a>(&'a JobstateRecord);

impl fmt::Display for RecordFields<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.0;
        write!(f, "{} {}", r.stamp, r.event)?;
        or_dash(&r.addon, f)?;
        or_dash(&r.site, f)?;
        or_dash(&r.walltime, f)
    }
}

/// Synthetic lifecycle markers written with job id `INTERNAL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalMarker {
    TailstatdStarted,
    DagmanStarted,
    DagmanFinished,
    TailstatdFinished(i32),
}

impl fmt::Display for InternalMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InternalMarker::TailstatdStarted => f.write_str("*** TAILSTATD_STARTED ***"),
            InternalMarker::DagmanStarted => f.write_str("*** DAGMAN_STARTED ***"),
            InternalMarker::DagmanFinished => f.write_str("*** DAGMAN_FINISHED ***"),
            InternalMarker::TailstatdFinished(code) => {
                write!(f, "*** TAILSTATD_FINISHED {code} ***")
            }
        }
    }
}

/// A marker line: `<stamp> INTERNAL <marker>`.
pub fn marker_line(stamp: i64, marker: InternalMarker) -> String {
    format!("{stamp} INTERNAL {marker}")
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
