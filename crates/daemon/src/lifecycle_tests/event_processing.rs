// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const SUBMIT_A: &str = "01/15 10:20:30 Event: ULOG_SUBMIT for Condor Node A (123.0.0)";
const EXECUTE_A: &str = "01/15 10:21:30 Event: ULOG_EXECUTE for Condor Node A (123.0.0)";
const PID: &str = "01/15 10:20:00 ** PID = 4321";
const FINISHED: &str = "01/15 10:30:00 (condor_DAGMAN) pid 4321 EXITING WITH STATUS 0";

#[test]
fn submit_line_is_planned_and_logged() {
    let mut fx = Fixture::replay();
    fx.submit = FakeSubmitFiles::new().with_plan("A", "S1", 2);
    let mut daemon = fx.start();

    daemon.process_line(SUBMIT_A);

    assert_eq!(
        fx.jobstate(),
        vec![
            "INTERNAL *** TAILSTATD_STARTED ***",
            "A SUBMIT 123.0 S1 120",
        ]
    );
    let lookups = fx.submit.lookups();
    assert_eq!(lookups.len(), 1);
    assert_eq!(lookups[0].0, "A");
    assert_eq!(daemon.state.workflow.job("A").map(|j| j.state.as_str()), Some("SUBMIT"));
}

#[test]
fn only_submit_consults_submit_files() {
    let fx = Fixture::replay();
    let mut daemon = fx.start();

    daemon.process_line(EXECUTE_A);
    assert!(fx.submit.lookups().is_empty());
    assert!(daemon.state.running().contains_key("A"));
}

#[test]
fn unrecognized_lines_are_ignored() {
    let fx = Fixture::replay();
    let mut daemon = fx.start();

    daemon.process_line("");
    daemon.process_line("no header here");
    daemon.process_line("01/15 10:20:30 Of 3 nodes total:");

    assert_eq!(fx.jobstate(), vec!["INTERNAL *** TAILSTATD_STARTED ***"]);
    assert_eq!(daemon.terminate(), None);
}

#[test]
fn submit_emits_mainjob_and_state_metrics() {
    let mut fx = Fixture::replay();
    fx.submit = FakeSubmitFiles::new().with_plan("A", "S1", 2);
    let mut daemon = fx.start();

    daemon.process_line(SUBMIT_A);

    let calls = fx.metrics.calls();
    let events: Vec<&str> = calls.iter().map(|c| c.event.as_str()).collect();
    assert_eq!(events, vec!["workflow.plan", "job.mainjob.start", "job.state"]);

    let start = &calls[1];
    assert_eq!(start.field("job_id"), Some("A"));
    assert_eq!(start.field("sched_id"), Some("123.0"));
    assert_eq!(start.field("site"), Some("S1"));
    assert_eq!(start.field("submit_seq"), Some("1"));

    let state = &calls[2];
    assert_eq!(state.field("state"), Some("SUBMIT"));
    assert_eq!(state.field("wf.id"), Some("wf-test"));
}

#[test]
fn script_events_emit_start_and_end_metrics() {
    let fx = Fixture::replay();
    let mut daemon = fx.start();

    daemon.process_line("01/15 10:20:30 Running PRE script of Node A...");
    daemon.process_line("01/15 10:20:31 PRE Script of Node A completed successfully.");
    daemon.process_line("01/15 10:25:00 POST Script of Node A failed with status 42");

    let events = fx.metrics.events();
    assert_eq!(
        events,
        vec![
            "workflow.plan",
            "job.prescript.start",
            "job.state",
            "job.prescript.end",
            "job.state",
            "job.postscript.end",
            "job.state",
        ]
    );
    let post = fx
        .metrics
        .calls()
        .into_iter()
        .find(|c| c.event == "job.postscript.end")
        .unwrap();
    assert_eq!(post.field("exitcode"), Some("42"));
    assert_eq!(post.field("duration"), Some(""));

    let pre = fx
        .metrics
        .calls()
        .into_iter()
        .find(|c| c.event == "job.prescript.end")
        .unwrap();
    assert_eq!(pre.field("exitcode"), Some("0"));
    assert_eq!(pre.field("duration"), Some("1"));
}

#[yare::parameterized(
    succeeded = { "01/15 10:29:00 Node A job proc (123.0.0) completed successfully.", "0" },
    failed    = { "01/15 10:29:00 Node A job proc (123.0.0) failed with status 3.", "3" },
)]
fn main_job_end_reports_exit_code_and_runtime(line: &str, exitcode: &str) {
    let fx = Fixture::replay();
    let mut daemon = fx.start();

    daemon.process_line(SUBMIT_A);
    daemon.process_line(line);

    let calls = fx.metrics.calls();
    let end = calls.iter().find(|c| c.event == "job.mainjob.end").unwrap();
    assert_eq!(end.field("job_id"), Some("A"));
    assert_eq!(end.field("sched_id"), Some("123.0"));
    assert_eq!(end.field("exitcode"), Some(exitcode));
    assert_eq!(end.field("duration"), Some("510"));
}

#[test]
fn dagman_pid_in_replay_is_logged_but_not_monitored() {
    let fx = Fixture::replay();
    let mut daemon = fx.start();

    daemon.process_line(PID);

    assert_eq!(daemon.dagman_pid(), None);
    assert_eq!(
        fx.jobstate(),
        vec![
            "INTERNAL *** TAILSTATD_STARTED ***",
            "INTERNAL *** DAGMAN_STARTED ***",
        ]
    );
    assert!(fx.metrics.events().contains(&"workflow.start".to_string()));
}

#[tokio::test]
async fn dagman_pid_is_monitored_when_live() {
    let fx = Fixture::new(&[]);
    let mut daemon = fx.start();

    daemon.process_line(PID);
    assert_eq!(daemon.dagman_pid(), Some(4321));
}

#[test]
fn dagman_exit_sets_terminate_and_last_one_wins() {
    let fx = Fixture::replay();
    let mut daemon = fx.start();

    daemon.process_line(FINISHED);
    assert_eq!(daemon.terminate(), Some(0));
    daemon.process_line("01/15 10:31:00 (condor_DAGMAN) pid 4321 EXITING WITH STATUS 2");
    assert_eq!(daemon.terminate(), Some(2));

    let ends: Vec<String> = fx
        .metrics
        .calls()
        .into_iter()
        .filter(|c| c.event == "workflow.end")
        .filter_map(|c| c.field("status").map(str::to_string))
        .collect();
    assert_eq!(ends, vec!["0", "2"]);
    assert_eq!(
        fx.jobstate()
            .iter()
            .filter(|l| l.as_str() == "INTERNAL *** DAGMAN_FINISHED ***")
            .count(),
        2
    );
}

#[test]
fn last_retry_flags_job() {
    let fx = Fixture::replay();
    let mut daemon = fx.start();

    daemon.process_line("01/15 10:20:30 Retrying node A (retry #3 of 3)...");
    assert_eq!(daemon.state.retry_flag("A"), Some(3));
}

#[test]
fn condor_log_in_replay_leaves_alias_alone() {
    let fx = Fixture::replay();
    let mut daemon = fx.start();
    let common = fx.path("common.log");

    daemon.process_line(&format!(
        "01/15 10:20:30 Condor log will be written to {}, etc.",
        common.display()
    ));

    let alias = alias_for(&fx.config.out_file, &fx.config.run_dir);
    assert!(std::fs::symlink_metadata(alias).is_err());
}

#[tokio::test]
async fn condor_log_links_alias_and_copies_back() {
    let fx = Fixture::new(&[]);
    let mut daemon = fx.start();
    let elsewhere = tempdir().unwrap();
    let common = elsewhere.path().join("common.log");
    std::fs::write(&common, "000 (123.000.000) Job submitted\n").unwrap();

    daemon.process_line(&format!(
        "01/15 10:20:30 Condor log will be written to {}, etc.",
        common.display()
    ));

    let alias = alias_for(&fx.config.out_file, &fx.config.run_dir);
    assert_eq!(alias, fx.path("wf.log"));
    assert!(std::fs::symlink_metadata(&alias)
        .unwrap()
        .file_type()
        .is_symlink());

    daemon.apply(START, LogEvent::DagmanFinished { status: 0 });
    daemon.shutdown(StopReason::Finished).await;

    let meta = std::fs::symlink_metadata(&alias).unwrap();
    assert!(meta.file_type().is_file());
    assert_eq!(
        std::fs::read_to_string(&alias).unwrap(),
        "000 (123.000.000) Job submitted\n"
    );
}

#[test]
fn queue_id_falls_back_for_metrics() {
    let fx = Fixture::replay();
    let mut daemon = fx.start();

    daemon.process_line(SUBMIT_A);
    daemon.process_line("01/15 10:25:00 POST Script of Node A completed successfully.");

    let last = fx.metrics.calls().pop().unwrap();
    assert_eq!(last.event, "job.state");
    assert_eq!(last.field("state"), Some("POST_SCRIPT_SUCCESS"));
    assert_eq!(last.field("sched_id"), Some("123.0"));
}
