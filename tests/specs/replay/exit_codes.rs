//! Replay specs: exit status

use crate::prelude::*;

#[test]
fn exit_status_mirrors_dagman() {
    let run = RunDir::with_out(&as_strs(&diamond(3)));

    tailstatd().args(&["-n", "-r"]).arg(run.out()).exits(3);

    assert_eq!(
        run.jobstate().last().map(String::as_str),
        Some("INTERNAL *** TAILSTATD_FINISHED 3 ***")
    );
}

#[test]
fn missing_out_file_in_replay_is_fatal() {
    let run = RunDir::empty();

    tailstatd().args(&["-n", "-r"]).arg(run.out()).exits(42);

    assert_eq!(
        run.jobstate(),
        vec![
            "INTERNAL *** TAILSTATD_STARTED ***",
            "INTERNAL *** TAILSTATD_FINISHED 42 ***",
        ]
    );
}

#[test]
fn last_dagman_exit_line_wins() {
    let mut lines = diamond(1);
    lines.push("01/15 10:40:00 (condor_DAGMAN) pid 4321 EXITING WITH STATUS 0".to_string());
    let run = RunDir::with_out(&as_strs(&lines));

    tailstatd().args(&["-n", "-r"]).arg(run.out()).passes();
}
