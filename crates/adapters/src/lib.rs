// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for everything outside the daemon process: the batch queue,
//! DAGMan's process, submit files and the metrics sink

mod env;
pub mod metrics;
pub mod probe;
pub mod queue;
pub mod submit;
pub mod subprocess;
pub mod traced;

pub use metrics::{MetricsSink, TracingMetricsSink};
pub use probe::{KillProbe, ProcessProbe};
pub use queue::{CondorQueueManager, QueueError, QueueManager, RemovalReport};
pub use submit::{dag_path_for, out_stem, parse_submit_file, DagSubmitFiles, SubmitFileReader};
pub use traced::TracedQueue;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use metrics::{FakeMetricsSink, MetricsCall};
#[cfg(any(test, feature = "test-support"))]
pub use probe::FakeProcessProbe;
#[cfg(any(test, feature = "test-support"))]
pub use queue::{FakeQueueManager, RemovalCall};
#[cfg(any(test, feature = "test-support"))]
pub use submit::FakeSubmitFiles;
