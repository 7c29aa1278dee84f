// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event extraction from DAGMan out-file lines.
//!
//! Only lines starting with an `MM/DD HH:MM:SS` header are considered. The
//! remainder is tried against [`MATCHERS`] in order and the first pattern
//! that matches decides the outcome, even when it yields no event. Later
//! patterns are looser than earlier ones, so the order matters.

use std::sync::LazyLock;

use chrono::{Datelike, Local, TimeZone, Utc};
use regex::Regex;

use crate::event::{names, JobEvent, LogEvent, ScriptKind};

#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("constant regex pattern is valid")
}

static TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^\s*(\d{1,2})/(\d{1,2})\s+(\d{1,2}):(\d{2}):(\d{2})"));
static JOB_EVENT: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"Event:\s+ULOG_(\S+) for Condor (?:Job|Node) (\S+)\s+\(([0-9]+\.[0-9]+)(\.[0-9]+)?\)$",
    )
});
static SCRIPT_RUNNING: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\d{2}\sRunning (PRE|POST) script of (?:Job|Node) (.+)\.{3}"));
static SCRIPT_DONE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\d{2}\s(PRE|POST) Script of (?:Job|Node) (\S+)"));
static SCRIPT_SUCCESS: LazyLock<Regex> = LazyLock::new(|| compile(r"completed successfully\.$"));
static SCRIPT_FAILED: LazyLock<Regex> =
    LazyLock::new(|| compile(r"failed with status\s+(-?\d+)\.?$"));
static JOB_FAILED: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\d{2}\sNode (\S+) job proc \(([0-9.]+)\) failed with status\s+(-?\d+)\.$")
});
static JOB_SUCCEEDED: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\d{2}\sNode (\S+) job proc \(([0-9.]+)\) completed successfully\.$")
});
static RETRY: LazyLock<Regex> =
    LazyLock::new(|| compile(r"Retrying node (\S+) \(retry #(\d+) of (\d+)\)"));
static DAGMAN_FINISHED: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\(condor_DAGMAN\)[\w\s]+EXITING WITH STATUS (\d+)$"));
static DAGMAN_PID: LazyLock<Regex> = LazyLock::new(|| compile(r"\*\* PID = (\d+)$"));
static CONDOR_VERSION: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\*\* \$CondorVersion: ((\d+\.\d+)\.\d+)"));
static CONDOR_LOG: LazyLock<Regex> =
    LazyLock::new(|| compile(r"Condor log will be written to ([^,]+)"));
static CONDOR_LOG_LISTED: LazyLock<Regex> = LazyLock::new(|| compile(r"\d{2}\s{3,}(\S+)"));
static MULTILINE_FILES: LazyLock<Regex> =
    LazyLock::new(|| compile(r"All DAG node user log files:"));

/// Result of trying one pattern against a line.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    NoMatch,
    /// Pattern matched but the line carries nothing to act on.
    Ignored,
    Event(LogEvent),
}

/// `(name, matcher)`. The flag argument is the one-shot multi-line marker.
type Matcher = fn(&str, bool) -> Outcome;

const MATCHERS: &[(&str, Matcher)] = &[
    ("job_event", match_job_event),
    ("script_running", match_script_running),
    ("script_done", match_script_done),
    ("job_failed", match_job_failed),
    ("job_succeeded", match_job_succeeded),
    ("retry", match_retry),
    ("dagman_finished", match_dagman_finished),
    ("dagman_pid", match_dagman_pid),
    ("condor_version", match_condor_version),
    ("condor_log", match_condor_log),
    ("multiline_files", match_multiline_files),
];

/// One recognized line: epoch timestamp plus the event it carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub stamp: i64,
    pub event: LogEvent,
}

/// Stateful line-to-event converter.
///
/// The only state is the one-shot multi-line flag and the timezone
/// configuration; everything else is a pure function of the line.
#[derive(Debug, Clone)]
pub struct Extractor<Tz: TimeZone = Local> {
    tz: Tz,
    adjustment: i64,
    multiline: bool,
}

impl Extractor<Local> {
    /// Extractor interpreting timestamps in local time, shifted by
    /// `adjustment` seconds.
    pub fn new(adjustment: i64) -> Self {
        Self::with_timezone(Local, adjustment)
    }
}

impl<Tz: TimeZone> Extractor<Tz> {
    pub fn with_timezone(tz: Tz, adjustment: i64) -> Self {
        Self {
            tz,
            adjustment,
            multiline: false,
        }
    }

    /// Whether the next condor-log listing line will be recognized.
    #[cfg(test)]
    pub(crate) fn multiline_pending(&self) -> bool {
        self.multiline
    }

    /// Extract using the current year in the configured timezone.
    pub fn extract_now(&mut self, line: &str) -> Option<ParsedLine> {
        let year = Utc::now().with_timezone(&self.tz).year();
        self.extract(line, year)
    }

    /// Extract an event from one line. DAGMan headers carry no year, so the
    /// caller supplies it.
    pub fn extract(&mut self, line: &str, year: i32) -> Option<ParsedLine> {
        let line = line.trim_end();
        let stamp = self.stamp(line, year)?;

        for (name, matcher) in MATCHERS {
            match matcher(line, self.multiline) {
                Outcome::NoMatch => continue,
                Outcome::Ignored => {
                    tracing::trace!(pattern = name, "line matched, nothing to record");
                    return None;
                }
                Outcome::Event(event) => {
                    match &event {
                        LogEvent::CondorLog { .. } => self.multiline = false,
                        LogEvent::MultilineFiles => self.multiline = true,
                        _ => {}
                    }
                    return Some(ParsedLine { stamp, event });
                }
            }
        }
        None
    }

    /// Epoch seconds for a line's `MM/DD HH:MM:SS` header, or `None` when the
    /// line has no valid header.
    pub fn stamp(&self, line: &str, year: i32) -> Option<i64> {
        let caps = TIMESTAMP.captures(line)?;
        let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
        let (month, day, hour, minute, second) = (field(1)?, field(2)?, field(3)?, field(4)?, field(5)?);

        let Some(local) = self
            .tz
            .with_ymd_and_hms(year, month, day, hour, minute, second)
            .earliest()
        else {
            tracing::debug!(month, day, hour, minute, second, "invalid timestamp header");
            return None;
        };
        Some(local.timestamp() + self.adjustment)
    }
}

/// Parse an exit status, falling back to `fallback` when the digits do not
/// fit.
fn parse_status(raw: &str, fallback: i32) -> i32 {
    raw.parse().unwrap_or_else(|_| {
        tracing::warn!(raw, "unable to convert exit code to integer");
        fallback
    })
}

fn match_job_event(line: &str, _: bool) -> Outcome {
    let Some(caps) = JOB_EVENT.captures(line) else {
        return Outcome::NoMatch;
    };
    Outcome::Event(LogEvent::Job(
        JobEvent::new(&caps[2], &caps[1]).with_queue_id(&caps[3]),
    ))
}

fn match_script_running(line: &str, _: bool) -> Outcome {
    let Some(caps) = SCRIPT_RUNNING.captures(line) else {
        return Outcome::NoMatch;
    };
    let Some(script) = ScriptKind::parse(&caps[1]) else {
        return Outcome::Ignored;
    };
    Outcome::Event(LogEvent::Job(JobEvent::new(&caps[2], script.started())))
}

fn match_script_done(line: &str, _: bool) -> Outcome {
    let Some(caps) = SCRIPT_DONE.captures(line) else {
        return Outcome::NoMatch;
    };
    let Some(script) = ScriptKind::parse(&caps[1]) else {
        return Outcome::Ignored;
    };
    let job_id = &caps[2];

    if SCRIPT_SUCCESS.is_match(line) {
        return Outcome::Event(LogEvent::Job(
            JobEvent::new(job_id, script.success()).with_status(0),
        ));
    }
    if let Some(failed) = SCRIPT_FAILED.captures(line) {
        let status = parse_status(&failed[1], 1);
        return Outcome::Event(LogEvent::Job(
            JobEvent::new(job_id, script.failure()).with_status(status),
        ));
    }

    let tail_start = line.len().saturating_sub(14);
    let tail = line.get(tail_start..).unwrap_or(line);
    tracing::warn!(job_id, tail, "unknown script state");
    Outcome::Ignored
}

fn match_job_failed(line: &str, _: bool) -> Outcome {
    let Some(caps) = JOB_FAILED.captures(line) else {
        return Outcome::NoMatch;
    };
    let status = parse_status(&caps[3], 1);
    Outcome::Event(LogEvent::Job(
        JobEvent::new(&caps[1], names::JOB_FAILURE)
            .with_queue_id(&caps[2])
            .with_status(status),
    ))
}

fn match_job_succeeded(line: &str, _: bool) -> Outcome {
    let Some(caps) = JOB_SUCCEEDED.captures(line) else {
        return Outcome::NoMatch;
    };
    Outcome::Event(LogEvent::Job(
        JobEvent::new(&caps[1], names::JOB_SUCCESS)
            .with_queue_id(&caps[2])
            .with_status(0),
    ))
}

fn match_retry(line: &str, _: bool) -> Outcome {
    let Some(caps) = RETRY.captures(line) else {
        return Outcome::NoMatch;
    };
    if caps[2] != caps[3] {
        return Outcome::Ignored;
    }
    match caps[3].parse::<u32>() {
        Ok(retries) => Outcome::Event(LogEvent::RetryExhausted {
            job_id: caps[1].to_string(),
            retries,
        }),
        Err(_) => {
            tracing::warn!(raw = &caps[3], "could not convert retry number to integer");
            Outcome::Ignored
        }
    }
}

fn match_dagman_finished(line: &str, _: bool) -> Outcome {
    let Some(caps) = DAGMAN_FINISHED.captures(line) else {
        return Outcome::NoMatch;
    };
    Outcome::Event(LogEvent::DagmanFinished {
        status: parse_status(&caps[1], 0),
    })
}

fn match_dagman_pid(line: &str, _: bool) -> Outcome {
    let Some(caps) = DAGMAN_PID.captures(line) else {
        return Outcome::NoMatch;
    };
    match caps[1].parse::<u32>() {
        Ok(pid) => Outcome::Event(LogEvent::DagmanPid { pid }),
        Err(_) => {
            tracing::warn!(raw = &caps[1], "cannot convert DAGMan pid to integer");
            Outcome::Ignored
        }
    }
}

fn match_condor_version(line: &str, _: bool) -> Outcome {
    let Some(caps) = CONDOR_VERSION.captures(line) else {
        return Outcome::NoMatch;
    };
    Outcome::Event(LogEvent::CondorVersion {
        version: caps[1].to_string(),
        major: caps[2].to_string(),
    })
}

fn match_condor_log(line: &str, multiline: bool) -> Outcome {
    let caps = CONDOR_LOG.captures(line).or_else(|| {
        if multiline {
            CONDOR_LOG_LISTED.captures(line)
        } else {
            None
        }
    });
    match caps {
        Some(caps) => Outcome::Event(LogEvent::CondorLog {
            path: caps[1].trim().to_string(),
        }),
        None => Outcome::NoMatch,
    }
}

fn match_multiline_files(line: &str, _: bool) -> Outcome {
    if MULTILINE_FILES.is_match(line) {
        Outcome::Event(LogEvent::MultilineFiles)
    } else {
        Outcome::NoMatch
    }
}

#[cfg(test)]
#[path = "extract_tests.rs"]
mod tests;
