// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch queue adapters used to remove starved jobs

mod condor;

pub use condor::CondorQueueManager;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeQueueManager, RemovalCall};

use async_trait::async_trait;
use thiserror::Error;
use tsd_core::QueueId;

/// Errors from queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("removal command failed: {0}")]
    CommandFailed(String),
}

/// Outcome of one removal request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalReport {
    /// The removal tool exited successfully.
    pub success: bool,
    /// The queue acknowledged an earlier, still pending removal.
    pub already_marked: bool,
    /// Combined stdout and stderr of the tool.
    pub output: String,
}

impl RemovalReport {
    pub fn from_output(success: bool, output: impl Into<String>) -> Self {
        let output = output.into();
        let already_marked = output
            .to_ascii_lowercase()
            .contains("already marked for removal");
        Self {
            success,
            already_marked,
            output,
        }
    }
}

/// Adapter for removing jobs from the batch queue
#[async_trait]
pub trait QueueManager: Clone + Send + Sync + 'static {
    /// Ask the queue to remove one job. `force` requests the tool's
    /// forced mode for jobs that ignore plain removal.
    async fn remove(&self, queue_id: &QueueId, force: bool) -> Result<RemovalReport, QueueError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
