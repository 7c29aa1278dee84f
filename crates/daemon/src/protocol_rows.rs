// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Row formatting for `job` and `site` responses.

use chrono::TimeZone;
use tsd_core::{time_fmt::iso_short_in, JobstateRecord, SiteInfo, SiteState, WaitBucket};
use tsd_storage::WorkflowState;

/// `<job> <stamp> <event> <addon|-> <site|-> <walltime|->\r\n`
pub fn job_row(record: &JobstateRecord) -> String {
    format!("{} {}\r\n", record.job_id, record.fields())
}

/// One site summary row plus a tab-indented row per wait bucket, newest
/// bucket first.
pub fn site_rows_in<Tz>(tz: &Tz, name: &str, info: &SiteInfo, buckets: &[(i64, WaitBucket)]) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let iso_or_null = |stamp: Option<i64>| {
        stamp.map_or_else(|| "null".to_string(), |s| iso_short_in(tz, s))
    };

    let mut out = format!(
        "{:<16} {:<21} {:>4} {:>4} {:>4} {:>6} {:>6} {:<20} {}\r\n",
        name,
        iso_short_in(tz, info.mtime),
        info.count(SiteState::Pending),
        info.count(SiteState::Running),
        info.count(SiteState::Other),
        info.count(SiteState::Succeeded),
        info.count(SiteState::Failed),
        iso_or_null(info.mtime_succ),
        iso_or_null(info.mtime_fail),
    );
    for (start, bucket) in buckets {
        out.push_str(&format!(
            "\t{:<20} {} {} {:.3}\r\n",
            iso_short_in(tz, *start),
            bucket.count,
            bucket.sum,
            bucket.mean()
        ));
    }
    out
}

/// Every site's rows, as written to `sitedump.txt` at shutdown.
pub fn site_dump(state: &WorkflowState) -> String {
    state
        .sites()
        .map(|(name, info)| site_rows_in(&chrono::Local, name, info, &state.waiting().rows(name)))
        .collect()
}
