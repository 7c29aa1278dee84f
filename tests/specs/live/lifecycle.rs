//! Live daemon lifecycle specs
//!
//! These run tailstatd against a growing out file with DAGMan's pid set to
//! a process whose liveness the test controls.

use crate::prelude::*;

/// Opening lines of a run whose DAGMan is `pid`.
fn opening(pid: u32) -> Vec<String> {
    vec![
        format!("01/15 10:20:00 ** PID = {pid}"),
        "01/15 10:20:10 Event: ULOG_SUBMIT for Condor Node A (101.0.0)".to_string(),
        "01/15 10:21:00 Event: ULOG_EXECUTE for Condor Node A (101.0.0)".to_string(),
    ]
}

const CLOSING: &[&str] = &[
    "01/15 10:25:00 Event: ULOG_JOB_TERMINATED for Condor Node A (101.0.0)",
    "01/15 10:32:00 (condor_DAGMAN) pid 4321 EXITING WITH STATUS 0",
];

fn start(run: &RunDir) -> Running {
    let daemon = tailstatd().args(&["-n"]).arg(run.out()).spawn();
    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || run.query_addr().is_some()),
        "daemon never published its port\n{}",
        run.daemon_log()
    );
    daemon
}

/// Pid of a process that has already exited.
fn dead_pid() -> u32 {
    let mut child = std::process::Command::new("true").spawn().unwrap();
    let pid = child.id();
    child.wait().unwrap();
    pid
}

#[test]
fn live_run_finalizes_run_directory() {
    let run = RunDir::with_out(&as_strs(&opening(std::process::id())));
    let daemon = start(&run);

    let pid = std::fs::read_to_string(run.file("tailstatd.pid")).unwrap();
    assert_eq!(pid.trim(), daemon.pid().to_string());
    assert!(run.file("remove.json").exists());

    run.append(CLOSING);
    assert_eq!(daemon.wait(), Some(0), "{}", run.daemon_log());

    for name in ["tailstatd.pid", "tailstatd.sock", "remove.json"] {
        assert!(!run.file(name).exists(), "{name} should be gone");
    }
    assert!(run.file("sitedump.txt").exists());
    let done = std::fs::read_to_string(run.file("tailstatd.done")).unwrap();
    assert_eq!(done.trim_end().split(' ').count(), 2);
}

#[test]
fn second_daemon_for_same_run_is_refused() {
    let run = RunDir::with_out(&as_strs(&opening(std::process::id())));
    let first = start(&run);

    tailstatd()
        .args(&["-n"])
        .arg(run.out())
        .exits(42)
        .stderr_has("already running");
    assert!(run.file("tailstatd.sock").exists());

    run.append(CLOSING);
    assert_eq!(first.wait(), Some(0));
}

#[test]
fn sigterm_stops_with_interrupted_status() {
    let run = RunDir::with_out(&as_strs(&opening(std::process::id())));
    let daemon = start(&run);

    daemon.signal("TERM");
    assert_eq!(daemon.wait(), Some(1));

    assert_eq!(
        run.jobstate().last().map(String::as_str),
        Some("INTERNAL *** TAILSTATD_FINISHED 1 ***")
    );
    assert!(!run.file("tailstatd.done").exists());
    assert!(run.file("remove.json").exists());
}

#[test]
fn vanished_dagman_is_fatal() {
    let run = RunDir::with_out(&as_strs(&opening(dead_pid())));
    let daemon = start(&run);

    assert_eq!(daemon.wait(), Some(42), "{}", run.daemon_log());
    assert!(run.file("tailstatd.done").exists());
    assert_eq!(
        run.jobstate().last().map(String::as_str),
        Some("INTERNAL *** TAILSTATD_FINISHED 42 ***")
    );
}

#[test]
fn late_out_file_is_awaited() {
    let run = RunDir::empty();
    let daemon = start(&run);

    let mut lines = opening(std::process::id());
    lines.extend(CLOSING.iter().map(|s| s.to_string()));
    run.append(&as_strs(&lines));

    assert_eq!(daemon.wait(), Some(0), "{}", run.daemon_log());
    assert!(run.jobstate().contains(&"A JOB_TERMINATED 101.0 - -".to_string()));
}
