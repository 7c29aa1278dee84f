// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake submit file reader for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::SubmitFileReader;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tsd_core::JobPlan;

struct FakeSubmitState {
    plans: HashMap<String, JobPlan>,
    lookups: Vec<(String, i64)>,
}

/// Reader backed by plans registered in the test.
#[derive(Clone)]
pub struct FakeSubmitFiles {
    inner: Arc<Mutex<FakeSubmitState>>,
}

impl Default for FakeSubmitFiles {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeSubmitState {
                plans: HashMap::new(),
                lookups: Vec::new(),
            })),
        }
    }
}

impl FakeSubmitFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plan with a site and a walltime in minutes.
    pub fn with_plan(self, job_id: &str, site: &str, minutes: u64) -> Self {
        self.set_plan(
            job_id,
            JobPlan {
                walltime_minutes: Some(minutes),
                site: Some(site.to_string()),
                ..JobPlan::default()
            },
        );
        self
    }

    pub fn set_plan(&self, job_id: &str, plan: JobPlan) {
        self.inner.lock().plans.insert(job_id.to_string(), plan);
    }

    /// `(job_id, stamp)` of every lookup so far.
    pub fn lookups(&self) -> Vec<(String, i64)> {
        self.inner.lock().lookups.clone()
    }
}

impl SubmitFileReader for FakeSubmitFiles {
    fn plan(&self, job_id: &str, stamp: i64) -> Option<JobPlan> {
        let mut inner = self.inner.lock();
        inner.lookups.push((job_id.to_string(), stamp));
        inner.plans.get(job_id).cloned()
    }
}
