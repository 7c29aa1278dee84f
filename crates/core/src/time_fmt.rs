// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared timestamp and duration formatting.

use chrono::{Local, TimeZone};

/// Format seconds as a short human-readable duration: `"5s"`, `"2m"`, `"1h30m"`, `"3d"`.
///
/// For the hours range, minutes are included when non-zero (e.g. `"1h"` vs `"1h5m"`).
pub fn format_elapsed(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        let h = secs / 3600;
        let m = (secs % 3600) / 60;
        if m > 0 {
            format!("{}h{}m", h, m)
        } else {
            format!("{}h", h)
        }
    } else {
        format!("{}d", secs / 86400)
    }
}

/// Compact ISO 8601 in local time: `20240115T102030+0100`.
pub fn iso_short(stamp: i64) -> String {
    iso_short_in(&Local, stamp)
}

/// Extended ISO 8601 in local time: `2024-01-15T10:20:30+0100`.
pub fn iso_long(stamp: i64) -> String {
    iso_long_in(&Local, stamp)
}

pub fn iso_short_in<Tz: TimeZone>(tz: &Tz, stamp: i64) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format_in(tz, stamp, "%Y%m%dT%H%M%S%z")
}

pub fn iso_long_in<Tz: TimeZone>(tz: &Tz, stamp: i64) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format_in(tz, stamp, "%Y-%m-%dT%H:%M:%S%z")
}

fn format_in<Tz: TimeZone>(tz: &Tz, stamp: i64, fmt: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match tz.timestamp_opt(stamp, 0).single() {
        Some(t) => t.format(fmt).to_string(),
        None => stamp.to_string(),
    }
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
