// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer for tailstatd: jobstate log, removal store, workflow state

mod jobstate_log;
mod removals;
mod state;

pub use jobstate_log::{JobstateLog, JobstateLogError, JobstateSink};
pub use removals::{RemovalAttempts, RemovalStoreError};
pub use state::{PendingEntry, QueueEntry, Recorded, RunningEntry, WorkflowState};
