// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `condor_rm` queue manager

use super::{QueueError, QueueManager, RemovalReport};
use crate::subprocess::run_with_timeout;
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tsd_core::QueueId;

/// Removes jobs by running `condor_rm [-forcex] <cluster.proc>`.
#[derive(Clone, Debug)]
pub struct CondorQueueManager {
    binary: String,
    timeout: Duration,
}

impl Default for CondorQueueManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CondorQueueManager {
    /// Binary and timeout from `TAILSTATD_CONDOR_RM` / `TAILSTATD_QUEUE_TIMEOUT_MS`.
    pub fn new() -> Self {
        Self::with_binary(crate::env::condor_rm_binary(), crate::env::queue_timeout())
    }

    pub fn with_binary(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl QueueManager for CondorQueueManager {
    async fn remove(&self, queue_id: &QueueId, force: bool) -> Result<RemovalReport, QueueError> {
        let mut cmd = Command::new(&self.binary);
        if force {
            cmd.arg("-forcex");
        }
        cmd.arg(queue_id.as_str());

        let output = run_with_timeout(cmd, self.timeout, &self.binary)
            .await
            .map_err(QueueError::CommandFailed)?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(RemovalReport::from_output(output.status.success(), text.trim()))
    }
}

#[cfg(test)]
#[path = "condor_tests.rs"]
mod tests;
