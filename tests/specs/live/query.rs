//! Live query specs (TSSP/1.0 over loopback TCP)

use crate::prelude::*;

fn running_workflow() -> (RunDir, Running) {
    let pid = std::process::id();
    let pid_line = format!("01/15 10:20:00 ** PID = {pid}");
    let run = RunDir::with_out(&[
        pid_line.as_str(),
        "01/15 10:20:10 Event: ULOG_SUBMIT for Condor Node A (101.0.0)",
        "01/15 10:20:11 Event: ULOG_SUBMIT for Condor Node B (102.0.0)",
        "01/15 10:21:00 Event: ULOG_EXECUTE for Condor Node A (101.0.0)",
    ]);
    let daemon = tailstatd().args(&["-n"]).arg(run.out()).spawn();
    assert!(wait_for(SPEC_WAIT_MAX_MS, || run.query_addr().is_some()));
    assert!(wait_for(SPEC_WAIT_MAX_MS, || run.jobstate().len() >= 5));
    (run, daemon)
}

fn finish(run: &RunDir, daemon: Running) {
    run.append(&["01/15 10:32:00 (condor_DAGMAN) pid 4321 EXITING WITH STATUS 0"]);
    assert_eq!(daemon.wait(), Some(0));
}

#[test]
fn single_job_query() {
    let (run, daemon) = running_workflow();

    let response = run.query("GET job A TSSP/1.0\r\n");
    let mut lines = response.split("\r\n");
    assert_eq!(lines.next(), Some("TSSP/1.0 200 OK"));
    let row: Vec<&str> = lines.next().unwrap().split(' ').collect();
    assert_eq!(row[0], "A");
    assert_eq!(&row[2..], ["EXECUTE", "101.0", "-", "-"]);

    finish(&run, daemon);
}

#[test]
fn wildcard_lists_jobs_in_first_seen_order() {
    let (run, daemon) = running_workflow();

    let response = run.query("GET job * TSSP/1.0\r\n");
    let jobs: Vec<&str> = response
        .split("\r\n")
        .skip(1)
        .filter(|l| !l.is_empty())
        .filter_map(|l| l.split(' ').next())
        .collect();
    assert_eq!(jobs, ["A", "B"]);

    finish(&run, daemon);
}

#[test]
fn unsupported_method_is_rejected() {
    let (run, daemon) = running_workflow();

    assert_eq!(
        run.query("POST job A TSSP/1.0\r\n"),
        "TSSP/1.0 405 Method not allowed\r\n"
    );

    finish(&run, daemon);
}
