// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;

const YEAR: i32 = 2024;
/// 2024-01-15T10:20:30Z
const STAMP: i64 = 1_705_314_030;

fn extractor() -> Extractor<Utc> {
    Extractor::with_timezone(Utc, 0)
}

fn job(line: &str) -> JobEvent {
    match extractor().extract(line, YEAR) {
        Some(ParsedLine {
            event: LogEvent::Job(job),
            ..
        }) => job,
        other => panic!("expected job event for {line:?}, got {other:?}"),
    }
}

#[test]
fn timestamp_header_is_converted_to_epoch() {
    let parsed = extractor()
        .extract("01/15 10:20:30 ** PID = 4321", YEAR)
        .unwrap();
    assert_eq!(parsed.stamp, STAMP);
}

#[test]
fn adjustment_is_added_to_every_stamp() {
    let mut ex = Extractor::with_timezone(Utc, 3600);
    let parsed = ex.extract("01/15 10:20:30 ** PID = 4321", YEAR).unwrap();
    assert_eq!(parsed.stamp, STAMP + 3600);
}

#[yare::parameterized(
    no_header       = { "Event: ULOG_SUBMIT for Condor Node A (123.0.0)" },
    empty           = { "" },
    bad_date        = { "02/31 10:20:30 ** PID = 4321" },
    unknown_content = { "01/15 10:20:30 Bootstrapping..." },
    partial_header  = { "01/15 10:20 ** PID = 4321" },
)]
fn lines_without_events_yield_nothing(line: &str) {
    assert_eq!(extractor().extract(line, YEAR), None);
}

#[yare::parameterized(
    node_submit    = { "01/15 10:20:30 Event: ULOG_SUBMIT for Condor Node A (123.0.0)", "A", "SUBMIT", "123.0" },
    job_execute    = { "01/15 10:20:30 Event: ULOG_EXECUTE for Condor Job B (7.0)", "B", "EXECUTE", "7.0" },
    globus_submit  = { "01/15 10:20:30 Event: ULOG_GLOBUS_SUBMIT for Condor Node C_1 (99.2.0)", "C_1", "GLOBUS_SUBMIT", "99.2" },
    trailing_crlf  = { "01/15 10:20:30 Event: ULOG_JOB_TERMINATED for Condor Node D (5.0.0)\r", "D", "JOB_TERMINATED", "5.0" },
)]
fn generic_job_events(line: &str, job_id: &str, kind: &str, queue_id: &str) {
    let event = job(line);
    assert_eq!(event.job_id, job_id);
    assert_eq!(event.kind, kind);
    assert_eq!(event.queue_id.as_deref(), Some(queue_id));
    assert_eq!(event.status, None);
}

#[yare::parameterized(
    pre  = { "01/15 10:20:30 Running PRE script of Node A...", "PRE_SCRIPT_STARTED" },
    post = { "01/15 10:20:30 Running POST script of Job A...", "POST_SCRIPT_STARTED" },
)]
fn script_started(line: &str, kind: &str) {
    let event = job(line);
    assert_eq!(event.job_id, "A");
    assert_eq!(event.kind, kind);
}

#[yare::parameterized(
    pre_success   = { "01/15 10:20:30 PRE Script of Node A completed successfully.", "PRE_SCRIPT_SUCCESS", 0 },
    post_success  = { "01/15 10:20:30 POST Script of Node A completed successfully.", "POST_SCRIPT_SUCCESS", 0 },
    post_failure  = { "01/15 10:20:30 POST Script of Node A failed with status 42", "POST_SCRIPT_FAILURE", 42 },
    pre_failure   = { "01/15 10:20:30 PRE Script of Job A failed with status -1.", "PRE_SCRIPT_FAILURE", -1 },
    overflow_code = { "01/15 10:20:30 POST Script of Node A failed with status 99999999999.", "POST_SCRIPT_FAILURE", 1 },
)]
fn script_completion(line: &str, kind: &str, status: i32) {
    let event = job(line);
    assert_eq!(event.job_id, "A");
    assert_eq!(event.kind, kind);
    assert_eq!(event.status, Some(status));
}

#[test]
fn script_completion_with_unknown_outcome_is_ignored() {
    let line = "01/15 10:20:30 POST Script of Node A was eaten by a grue";
    assert_eq!(extractor().extract(line, YEAR), None);
}

#[test]
fn job_failure_summary() {
    let event = job("01/15 10:20:30 Node A job proc (123.0.0) failed with status 3.");
    assert_eq!(event.kind, "JOB_FAILURE");
    assert_eq!(event.queue_id.as_deref(), Some("123.0.0"));
    assert_eq!(event.status, Some(3));
    assert_eq!(event.addon().as_deref(), Some("3"));
}

#[test]
fn job_success_summary() {
    let event = job("01/15 10:20:30 Node A job proc (123.0.0) completed successfully.");
    assert_eq!(event.kind, "JOB_SUCCESS");
    assert_eq!(event.status, Some(0));
}

#[test]
fn retry_exhaustion_is_reported_only_on_last_retry() {
    let mut ex = extractor();
    assert_eq!(
        ex.extract("01/15 10:20:30 Retrying node A (retry #1 of 3)...", YEAR),
        None
    );
    assert_eq!(
        ex.extract("01/15 10:20:30 Retrying node A (retry #3 of 3)...", YEAR),
        Some(ParsedLine {
            stamp: STAMP,
            event: LogEvent::RetryExhausted {
                job_id: "A".into(),
                retries: 3
            },
        })
    );
}

#[test]
fn first_matching_pattern_wins_even_without_event() {
    // The retry pattern is earlier than the pid pattern and swallows the line.
    let line = "01/15 10:20:30 Retrying node A (retry #1 of 3) ** PID = 5";
    assert_eq!(extractor().extract(line, YEAR), None);
}

#[yare::parameterized(
    success = { "01/15 10:20:30 (condor_DAGMAN) pid 4321 EXITING WITH STATUS 0", 0 },
    failure = { "01/15 10:20:30 (condor_DAGMAN) pid 4321 EXITING WITH STATUS 1", 1 },
    garbage = { "01/15 10:20:30 (condor_DAGMAN) pid 4321 EXITING WITH STATUS 99999999999", 0 },
)]
fn dagman_finished(line: &str, status: i32) {
    let parsed = extractor().extract(line, YEAR).unwrap();
    assert_eq!(parsed.event, LogEvent::DagmanFinished { status });
}

#[test]
fn dagman_pid_and_version() {
    let mut ex = extractor();
    assert_eq!(
        ex.extract("01/15 10:20:30 ** PID = 4321", YEAR).unwrap().event,
        LogEvent::DagmanPid { pid: 4321 }
    );
    assert_eq!(
        ex.extract(
            "01/15 10:20:30 ** $CondorVersion: 7.4.2 Mar 29 2010 BuildID: 227044 $",
            YEAR
        )
        .unwrap()
        .event,
        LogEvent::CondorVersion {
            version: "7.4.2".into(),
            major: "7.4".into()
        }
    );
}

#[test]
fn condor_log_location() {
    let line = "01/15 10:20:30 Condor log will be written to /tmp/run/x.log, etc.";
    assert_eq!(
        extractor().extract(line, YEAR).unwrap().event,
        LogEvent::CondorLog {
            path: "/tmp/run/x.log".into()
        }
    );
}

#[test]
fn listed_condor_log_requires_preceding_marker_and_is_one_shot() {
    let mut ex = extractor();
    let listed = "01/15 10:20:30   /tmp/run/common.log";

    assert_eq!(ex.extract(listed, YEAR), None);

    let marker = ex
        .extract("01/15 10:20:30 All DAG node user log files:", YEAR)
        .unwrap();
    assert_eq!(marker.event, LogEvent::MultilineFiles);
    assert!(ex.multiline_pending());

    assert_eq!(
        ex.extract(listed, YEAR).unwrap().event,
        LogEvent::CondorLog {
            path: "/tmp/run/common.log".into()
        }
    );
    assert!(!ex.multiline_pending());
    assert_eq!(ex.extract(listed, YEAR), None);
}
