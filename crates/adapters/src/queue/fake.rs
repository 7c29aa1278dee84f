// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake queue manager for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{QueueError, QueueManager, RemovalReport};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tsd_core::QueueId;

/// Recorded removal request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalCall {
    pub queue_id: String,
    pub force: bool,
}

struct FakeQueueState {
    calls: Vec<RemovalCall>,
    responses: VecDeque<Result<RemovalReport, String>>,
}

/// Queue manager that records requests and replays scripted responses.
///
/// Once the script runs out every removal succeeds.
#[derive(Clone)]
pub struct FakeQueueManager {
    inner: Arc<Mutex<FakeQueueState>>,
}

impl Default for FakeQueueManager {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeQueueState {
                calls: Vec::new(),
                responses: VecDeque::new(),
            })),
        }
    }
}

impl FakeQueueManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the report for the next removal.
    pub fn respond(&self, report: RemovalReport) {
        self.inner.lock().responses.push_back(Ok(report));
    }

    /// Make the next removal fail to run.
    pub fn fail_next(&self, message: &str) {
        self.inner
            .lock()
            .responses
            .push_back(Err(message.to_string()));
    }

    pub fn calls(&self) -> Vec<RemovalCall> {
        self.inner.lock().calls.clone()
    }
}

#[async_trait]
impl QueueManager for FakeQueueManager {
    async fn remove(&self, queue_id: &QueueId, force: bool) -> Result<RemovalReport, QueueError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RemovalCall {
            queue_id: queue_id.as_str().to_string(),
            force,
        });
        match inner.responses.pop_front() {
            Some(Ok(report)) => Ok(report),
            Some(Err(message)) => Err(QueueError::CommandFailed(message)),
            None => Ok(RemovalReport::from_output(
                true,
                format!("Job {queue_id} marked for removal"),
            )),
        }
    }
}
