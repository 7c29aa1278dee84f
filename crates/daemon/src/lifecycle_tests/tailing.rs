// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

use std::io::Write;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const RUN: &[&str] = &[
    "01/15 10:20:00 ** PID = 4321",
    "01/15 10:20:30 Event: ULOG_SUBMIT for Condor Node A (123.0.0)",
    "01/15 10:21:30 Event: ULOG_EXECUTE for Condor Node A (123.0.0)",
    "01/15 10:29:00 Event: ULOG_JOB_TERMINATED for Condor Node A (123.0.0)",
    "01/15 10:30:00 (condor_DAGMAN) pid 4321 EXITING WITH STATUS 0",
];

fn append(path: &Path, lines: &[&str]) {
    let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
}

#[tokio::test]
async fn replay_runs_to_completion() {
    let fx = Fixture::replay();
    fx.write_out(RUN);
    let mut daemon = fx.start();

    assert_eq!(daemon.run().await, StopReason::Finished);
    assert_eq!(daemon.terminate(), Some(0));
    assert_eq!(daemon.shutdown(StopReason::Finished).await, 0);

    assert_eq!(
        fx.jobstate(),
        vec![
            "INTERNAL *** TAILSTATD_STARTED ***",
            "INTERNAL *** DAGMAN_STARTED ***",
            "A SUBMIT 123.0 - -",
            "A EXECUTE 123.0 - -",
            "A JOB_TERMINATED 123.0 - -",
            "INTERNAL *** DAGMAN_FINISHED ***",
            "INTERNAL *** TAILSTATD_FINISHED 0 ***",
        ]
    );
}

#[tokio::test]
async fn replay_of_missing_out_file_fails_at_once() {
    let fx = Fixture::replay();
    let mut daemon = fx.start();

    let reason = daemon.run().await;
    assert_eq!(reason, StopReason::OutFileMissing);
    assert_eq!(daemon.shutdown(reason).await, FATAL_EXIT);
    assert_eq!(
        fx.jobstate().last().map(String::as_str),
        Some("INTERNAL *** TAILSTATD_FINISHED 42 ***")
    );
}

#[tokio::test]
async fn late_out_file_is_picked_up() {
    let fx = Fixture::new(&[]);
    let mut daemon = fx.start();
    let out = fx.path(OUT);

    let writer = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        std::fs::write(&out, RUN.join("\n") + "\n").unwrap();
    };
    let (reason, ()) = tokio::join!(daemon.run(), writer);

    assert_eq!(reason, StopReason::Finished);
    assert!(fx.jobstate().contains(&"A EXECUTE 123.0 - -".to_string()));
}

#[tokio::test]
async fn growth_is_followed_until_dagman_exits() {
    let fx = Fixture::replay();
    fx.write_out(&RUN[..2]);
    let mut daemon = fx.start();
    let out = fx.path(OUT);

    let writer = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        append(&out, &RUN[2..4]);
        tokio::time::sleep(Duration::from_millis(20)).await;
        append(&out, &RUN[4..]);
    };
    let (reason, ()) = tokio::join!(daemon.run(), writer);

    assert_eq!(reason, StopReason::Finished);
    assert!(daemon.state.running().is_empty());
    assert_eq!(fx.jobstate().len(), 6);
}

#[tokio::test]
async fn truncation_stops_the_loop() {
    let fx = Fixture::replay();
    fx.write_out(&RUN[..3]);
    let mut daemon = fx.start();
    let out = fx.path(OUT);

    let writer = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        std::fs::write(&out, "").unwrap();
    };
    let (reason, ()) = tokio::join!(daemon.run(), writer);

    assert_eq!(reason, StopReason::Truncated);
    assert_eq!(daemon.terminate(), None);
}

#[tokio::test]
async fn vanished_dagman_is_detected() {
    let fx = Fixture::new(&[]);
    fx.write_out(&RUN[..3]);
    let mut daemon = fx.start();

    assert_eq!(daemon.run().await, StopReason::UpstreamGone);
    assert_eq!(daemon.terminate(), Some(FATAL_EXIT));
    assert_eq!(fx.probe.probes(), vec![4321]);
    assert_eq!(daemon.shutdown(StopReason::UpstreamGone).await, FATAL_EXIT);
    assert!(fx.config.done_path.exists());
}

#[tokio::test]
async fn live_dagman_keeps_the_loop_waiting() {
    let fx = Fixture::new(&[]);
    fx.probe.set_alive(4321, true);
    fx.write_out(&RUN[..3]);
    let mut daemon = fx.start();
    let out = fx.path(OUT);

    let writer = async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        append(&out, &RUN[3..]);
    };
    let (reason, ()) = tokio::join!(daemon.run(), writer);

    assert_eq!(reason, StopReason::Finished);
    assert!(!fx.probe.probes().is_empty());
}

#[tokio::test]
async fn queries_are_answered_while_idle() {
    let fx = Fixture::new(&[]);
    fx.probe.set_alive(4321, true);
    fx.write_out(&RUN[..3]);
    let mut daemon = fx.start();
    let addr = daemon.query_addr().unwrap();
    let out = fx.path(OUT);

    let client = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"GET job A TSSP/1.0\r\n").await.unwrap();
        stream.shutdown().await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        append(&out, &RUN[3..]);
        response
    };
    let (reason, response) = tokio::join!(daemon.run(), client);

    assert_eq!(reason, StopReason::Finished);
    assert!(response.starts_with("TSSP/1.0 200 OK\r\nA "));
    assert!(response.contains(" EXECUTE 123.0 - -\r\n"));
}

#[tokio::test]
async fn idle_log_past_stall_limit_gives_up() {
    let fx = Fixture::new(&[]);
    fx.write_out(&RUN[1..2]);
    let mut daemon = fx.start().with_stall_limit(3);

    let reason = daemon.run().await;
    assert_eq!(reason, StopReason::Stalled);
    assert_eq!(daemon.terminate(), None);
    assert!(fx.probe.probes().is_empty());
    assert_eq!(daemon.shutdown(reason).await, FATAL_EXIT);
}

#[tokio::test]
async fn queries_are_answered_between_delayed_lines() {
    let fx = Fixture::new(&["-S", "100"]);
    fx.probe.set_alive(4321, true);
    fx.write_out(RUN);
    let mut daemon = fx.start();
    let addr = daemon.query_addr().unwrap();

    let client = async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"GET job A TSSP/1.0\r\n").await.unwrap();
        stream.shutdown().await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    };
    let (reason, response) = tokio::join!(daemon.run(), client);

    assert_eq!(reason, StopReason::Finished);
    assert!(response.starts_with("TSSP/1.0 200 OK\r\nA "));
    assert!(response.contains(" SUBMIT 123.0 - -\r\n"));
    assert!(fx.jobstate().contains(&"A JOB_TERMINATED 123.0 - -".to_string()));
}
