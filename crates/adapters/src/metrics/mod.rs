// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow metrics sinks
//!
//! Events are named like `workflow.start` or `job.state` and carry a flat
//! list of string fields. The daemon emits them; sinks decide where they go.

mod log;

pub use log::TracingMetricsSink;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeMetricsSink, MetricsCall};

/// Workflow planned (emitted once at startup).
pub const WORKFLOW_PLAN: &str = "workflow.plan";
pub const WORKFLOW_START: &str = "workflow.start";
pub const WORKFLOW_END: &str = "workflow.end";
pub const JOB_MAINJOB_START: &str = "job.mainjob.start";
pub const JOB_MAINJOB_END: &str = "job.mainjob.end";
pub const JOB_PRESCRIPT_START: &str = "job.prescript.start";
pub const JOB_PRESCRIPT_END: &str = "job.prescript.end";
pub const JOB_POSTSCRIPT_START: &str = "job.postscript.start";
pub const JOB_POSTSCRIPT_END: &str = "job.postscript.end";
pub const JOB_STATE: &str = "job.state";

/// Destination for workflow metrics events
pub trait MetricsSink: Clone + Send + Sync + 'static {
    fn emit(&self, event: &str, fields: &[(&str, String)]);
}
