// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Planning data from the DAG and its submit files

mod dag;
mod parse;

pub use dag::{dag_path_for, out_stem, DagSubmitFiles};
pub use parse::{job_class_name, parse_submit_file};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeSubmitFiles;

use tsd_core::JobPlan;

/// Looks up a job's planning data when it is submitted.
pub trait SubmitFileReader: Send + Sync + 'static {
    /// Plan for `job_id` as seen by an event stamped `stamp`.
    ///
    /// Returns `None` when the job has no submit file or the file is
    /// newer than the event, which means an old log is being reparsed
    /// against a replanned workflow.
    fn plan(&self, job_id: &str, stamp: i64) -> Option<JobPlan>;
}
