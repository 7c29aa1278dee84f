//! Replay specs: jobstate.log contents
//!
//! Replay reads a finished out file from the top and stops when DAGMan's
//! exit line has been seen and the file is exhausted.

use crate::prelude::*;

#[test]
fn diamond_replay_writes_every_transition() {
    let run = RunDir::with_out(&as_strs(&diamond(0)));

    tailstatd().args(&["-n", "-r"]).arg(run.out()).passes();

    similar_asserts::assert_eq!(
        run.jobstate(),
        vec![
            "INTERNAL *** TAILSTATD_STARTED ***",
            "INTERNAL *** DAGMAN_STARTED ***",
            "A PRE_SCRIPT_STARTED - - -",
            "A PRE_SCRIPT_SUCCESS 0 - -",
            "A SUBMIT 101.0 - -",
            "A EXECUTE 101.0 - -",
            "A JOB_TERMINATED 101.0 - -",
            "A JOB_SUCCESS 0 - -",
            "B SUBMIT 102.0 - -",
            "C SUBMIT 103.0 - -",
            "B EXECUTE 102.0 - -",
            "C EXECUTE 103.0 - -",
            "B JOB_TERMINATED 102.0 - -",
            "C JOB_TERMINATED 103.0 - -",
            "C POST_SCRIPT_SUCCESS 0 - -",
            "INTERNAL *** DAGMAN_FINISHED ***",
            "INTERNAL *** TAILSTATD_FINISHED 0 ***",
        ]
    );
}

#[test]
fn replay_appends_to_existing_jobstate() {
    let run = RunDir::with_out(&as_strs(&diamond(0)));
    std::fs::write(run.file("jobstate.log"), "1 X SUBMIT 1.0 - -\n").unwrap();

    tailstatd().args(&["-n", "-r"]).arg(run.out()).passes();

    let lines = run.jobstate();
    assert_eq!(lines[0], "X SUBMIT 1.0 - -");
    assert_eq!(lines[1], "INTERNAL *** TAILSTATD_STARTED ***");
}

#[test]
fn alternate_jobstate_path() {
    let run = RunDir::with_out(&as_strs(&diamond(0)));
    let custom = run.file("custom.log");

    tailstatd()
        .args(&["-n", "-r", "-j"])
        .arg(&custom)
        .arg(run.out())
        .passes();

    assert!(custom.exists());
    assert!(!run.file("jobstate.log").exists());
}

#[test]
fn replay_leaves_no_live_artifacts() {
    let run = RunDir::with_out(&as_strs(&diamond(0)));

    tailstatd().args(&["-n", "-r"]).arg(run.out()).passes();

    for name in [
        "tailstatd.pid",
        "tailstatd.sock",
        "tailstatd.done",
        "remove.json",
        "sitedump.txt",
    ] {
        assert!(!run.file(name).exists(), "{name} should not exist");
    }
}

#[test]
fn daemon_log_is_rotated_on_restart() {
    let run = RunDir::with_out(&as_strs(&diamond(0)));

    tailstatd().args(&["-n", "-r"]).arg(run.out()).passes();
    tailstatd().args(&["-n", "-r"]).arg(run.out()).passes();

    assert!(run.file("diamond.dag.tailstatd.log").exists());
    assert!(run.file("diamond.dag.tailstatd.log.000").exists());
}
