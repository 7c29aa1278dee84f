// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tailstatd
//!
//! Follows a DAGMan `.dagman.out` log, keeps the workflow's job states in
//! memory, appends them to `jobstate.log` and answers status queries on a
//! loopback TCP port until DAGMan finishes.
//!
//! Architecture:
//! - One current-thread runtime, one event loop
//! - The loop owns all state; the query listener and signals are polled
//!   from its idle points

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod env;
mod lifecycle;
mod listener;
mod logging;
mod signals;
mod tailer;
mod watchdog;

use std::ffi::OsString;
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};

use clap::Parser;
use tracing::{error, info, warn};
use tsd_adapters::{
    CondorQueueManager, DagSubmitFiles, KillProbe, TracedQueue, TracingMetricsSink,
};
use tsd_core::SystemClock;

use crate::config::{Args, Config, RunMode};
use crate::lifecycle::{Adapters, LifecycleError, FATAL_EXIT};
use crate::signals::Signals;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    let config = match Config::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tailstatd: {e}");
            std::process::exit(FATAL_EXIT);
        }
    };

    if config.mode == RunMode::Daemon {
        match detach() {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("tailstatd: failed to detach: {e}");
                std::process::exit(FATAL_EXIT);
            }
        }
    }

    let code = match run(&config).await {
        Ok(code) => code,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            eprintln!("tailstatd is already running for this workflow");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            FATAL_EXIT
        }
        Err(e) => {
            eprintln!("tailstatd: {e}");
            FATAL_EXIT
        }
    };
    std::process::exit(code);
}

async fn run(config: &Config) -> Result<i32, LifecycleError> {
    let rotated = logging::rotate_log(&config.log_path)?;
    let (log_guard, level) = logging::setup_logging(config)?;
    if let Some(rotated) = rotated {
        info!(previous = %rotated.display(), "rotated daemon log");
    }

    let adapters = Adapters {
        queue: TracedQueue::new(CondorQueueManager::new()),
        probe: KillProbe::new(),
        metrics: TracingMetricsSink::new(),
        clock: SystemClock,
        submit: Box::new(DagSubmitFiles::load(&config.dag_path, &config.run_dir)),
    };
    let daemon = match lifecycle::startup(config.clone(), adapters) {
        Ok(daemon) => daemon,
        Err(e) => {
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e);
        }
    };
    let mut daemon = daemon.with_level_control(level);
    match Signals::install() {
        Ok(signals) => daemon = daemon.with_signals(signals),
        Err(e) => warn!(error = %e, "failed to install signal handlers"),
    }
    if let Some(addr) = daemon.query_addr() {
        info!(%addr, "answering queries");
    }

    let reason = daemon.run().await;
    let code = daemon.shutdown(reason).await;
    drop(log_guard);
    Ok(code)
}

/// Arguments for the detached child: the original ones, in the foreground.
fn child_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    let mut out = vec![OsString::from("--foreground")];
    out.extend(args);
    out
}

/// Re-launch in a new process group with no terminal attached.
fn detach() -> std::io::Result<()> {
    let exe = std::env::current_exe()?;
    Command::new(exe)
        .args(child_args(std::env::args_os().skip(1)))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .process_group(0)
        .spawn()?;
    Ok(())
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
