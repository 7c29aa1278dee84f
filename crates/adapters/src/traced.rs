// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::queue::{QueueError, QueueManager, RemovalReport};
use async_trait::async_trait;
use tracing::Instrument;
use tsd_core::QueueId;

/// Wrapper that adds tracing to any QueueManager
#[derive(Clone)]
pub struct TracedQueue<Q> {
    inner: Q,
}

impl<Q> TracedQueue<Q> {
    pub fn new(inner: Q) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<Q: QueueManager> QueueManager for TracedQueue<Q> {
    async fn remove(&self, queue_id: &QueueId, force: bool) -> Result<RemovalReport, QueueError> {
        async {
            tracing::info!("requesting removal");
            let start = std::time::Instant::now();
            let result = self.inner.remove(queue_id, force).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(report) if report.success => {
                    tracing::info!(elapsed_ms, output = %report.output, "removal accepted")
                }
                Ok(report) => tracing::warn!(
                    elapsed_ms,
                    already_marked = report.already_marked,
                    output = %report.output,
                    "removal refused"
                ),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "removal failed"),
            }
            result
        }
        .instrument(tracing::info_span!("queue.remove", queue_id = %queue_id, force))
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
