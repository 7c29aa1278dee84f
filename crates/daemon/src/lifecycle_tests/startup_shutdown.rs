// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn replay_startup_touches_only_the_jobstate_log() {
    let fx = Fixture::replay();
    let daemon = fx.start();

    assert_eq!(fx.jobstate(), vec!["INTERNAL *** TAILSTATD_STARTED ***"]);
    assert!(!fx.config.lock_path.exists());
    assert!(!fx.config.discovery_path.exists());
    assert!(!fx.config.removals_path.exists());
    assert!(daemon.query_addr().is_none());
    assert!(daemon.removals().is_none());
}

#[test]
fn startup_marker_uses_clock() {
    let fx = Fixture::replay();
    let _daemon = fx.start();

    let lines = read_lines(&fx.config.jobstate_path);
    assert_eq!(lines, vec![format!("{START} INTERNAL *** TAILSTATD_STARTED ***")]);
}

#[test]
fn startup_emits_plan_metric() {
    let fx = Fixture::replay();
    let _daemon = fx.start();

    let calls = fx.metrics.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].event, "workflow.plan");
    assert_eq!(calls[0].field("wf.id"), Some("wf-test"));
    assert_eq!(calls[0].field("ts"), Some(START.to_string().as_str()));
}

#[test]
fn disabled_metrics_emit_nothing() {
    let fx = Fixture::new(&["-r", "--no-metrics"]);
    let mut daemon = fx.start();
    daemon.apply(START, LogEvent::DagmanFinished { status: 0 });

    assert!(fx.metrics.calls().is_empty());
}

#[tokio::test]
async fn live_startup_takes_lock_and_publishes_port() {
    let fx = Fixture::new(&[]);
    let daemon = fx.start();

    let pid = std::fs::read_to_string(&fx.config.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());

    let addr = daemon.query_addr().unwrap();
    assert_eq!(
        std::fs::read_to_string(&fx.config.discovery_path).unwrap(),
        format!("127.0.0.1 {}\n", addr.port())
    );
    assert!(fx.config.removals_path.exists());
}

#[tokio::test]
async fn second_daemon_fails_to_lock_and_leaves_files() {
    let fx = Fixture::new(&[]);
    let _first = fx.start();

    let err = fx.try_start().err().unwrap();
    assert!(matches!(err, LifecycleError::LockFailed(_)));
    assert!(fx.config.lock_path.exists());
    assert!(fx.config.discovery_path.exists());
}

#[tokio::test]
async fn clean_shutdown_finalizes_run_directory() {
    let fx = Fixture::new(&[]);
    let mut daemon = fx.start();
    daemon.apply(START + 5, LogEvent::DagmanFinished { status: 0 });
    fx.clock.advance_secs(90);

    let code = daemon.shutdown(StopReason::Finished).await;

    assert_eq!(code, 0);
    assert_eq!(
        fx.jobstate().last().map(String::as_str),
        Some("INTERNAL *** TAILSTATD_FINISHED 0 ***")
    );
    assert!(!fx.config.lock_path.exists());
    assert!(!fx.config.discovery_path.exists());
    assert!(!fx.config.removals_path.exists());
    assert!(fx.config.sitedump_path.exists());

    let done = std::fs::read_to_string(&fx.config.done_path).unwrap();
    let (when, duration) = done.trim_end().split_once(' ').unwrap();
    assert_eq!(when, iso_long(START + 90));
    assert_eq!(duration, "90.000");
}

#[tokio::test]
async fn failed_workflow_keeps_removal_store() {
    let fx = Fixture::new(&[]);
    let mut daemon = fx.start();
    daemon.apply(START, LogEvent::DagmanFinished { status: 1 });

    let code = daemon.shutdown(StopReason::Finished).await;

    assert_eq!(code, 1);
    assert!(fx.config.removals_path.exists());
    assert!(fx.config.done_path.exists());
}

#[tokio::test]
async fn interrupted_run_exits_one_without_done_file() {
    let fx = Fixture::new(&[]);
    let daemon = fx.start();

    let code = daemon.shutdown(StopReason::Signal("SIGTERM")).await;

    assert_eq!(code, INTERRUPTED_EXIT);
    assert!(!fx.config.done_path.exists());
    assert!(fx.config.removals_path.exists());
    assert!(fx.jobstate().contains(&"INTERNAL *** TAILSTATD_FINISHED 1 ***".to_string()));
}

#[yare::parameterized(
    finished_without_status = { StopReason::Finished, None, FATAL_EXIT },
    upstream_gone           = { StopReason::UpstreamGone, Some(42), FATAL_EXIT },
    stalled                 = { StopReason::Stalled, None, FATAL_EXIT },
    truncated               = { StopReason::Truncated, None, FATAL_EXIT },
    truncated_after_finish  = { StopReason::Truncated, Some(0), 0 },
    signal                  = { StopReason::Signal("SIGINT"), None, INTERRUPTED_EXIT },
    signal_after_finish     = { StopReason::Signal("SIGINT"), Some(3), 3 },
    missing_out_file        = { StopReason::OutFileMissing, None, FATAL_EXIT },
)]
fn exit_code_prefers_dagman_status(reason: StopReason, status: Option<i32>, expected: i32) {
    let fx = Fixture::replay();
    let mut daemon = fx.start();
    if let Some(status) = status {
        daemon.apply(START, LogEvent::DagmanFinished { status });
    }
    assert_eq!(daemon.exit_code(&reason), expected);
}

#[tokio::test]
async fn replay_shutdown_writes_only_the_marker() {
    let fx = Fixture::replay();
    let mut daemon = fx.start();
    daemon.apply(START, LogEvent::DagmanFinished { status: 0 });

    assert_eq!(daemon.shutdown(StopReason::Finished).await, 0);
    assert!(!fx.config.done_path.exists());
    assert!(!fx.config.sitedump_path.exists());
    assert_eq!(
        fx.jobstate(),
        vec![
            "INTERNAL *** TAILSTATD_STARTED ***",
            "INTERNAL *** DAGMAN_FINISHED ***",
            "INTERNAL *** TAILSTATD_FINISHED 0 ***",
        ]
    );
}
