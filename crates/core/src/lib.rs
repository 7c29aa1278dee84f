// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tsd-core: data model and line parsing for the tailstatd daemon

pub mod clock;
pub mod event;
pub mod extract;
pub mod job;
pub mod queue_id;
pub mod record;
pub mod site;
pub mod time_fmt;

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "test-support"))]
pub use clock::FakeClock;
pub use event::{is_pending, is_running, is_unsubmitted, names, JobEvent, LogEvent, ScriptKind};
pub use extract::{Extractor, ParsedLine};
pub use job::{Job, JobPlan, Registration, ScriptRun, Workflow};
pub use queue_id::{QueueId, QueueIdError};
pub use record::{marker_line, InternalMarker, JobstateRecord};
pub use site::{SiteInfo, SiteState, WaitBucket, WaitingHistogram, BUCKET_SECS};
pub use time_fmt::{format_elapsed, iso_long, iso_short};
