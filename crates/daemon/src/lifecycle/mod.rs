// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, the tail loop, finalization.

mod condor_log;
mod event_loop;
mod process;

pub use condor_log::{alias_for, copy_back, reconcile_alias, AliasOutcome};
pub use event_loop::{StopReason, OUT_FILE_ATTEMPTS};

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use fs2::FileExt;
use thiserror::Error;
use tracing::{info, warn};
use tsd_adapters::{metrics, MetricsSink, ProcessProbe, QueueManager, SubmitFileReader};
use tsd_core::{iso_long, Clock, Extractor, InternalMarker};
use tsd_storage::{
    JobstateLog, JobstateLogError, JobstateSink, RemovalAttempts, RemovalStoreError,
    WorkflowState,
};

use crate::config::{Config, ConfigError};
use crate::listener::QueryServer;
use crate::logging::LevelControl;
use crate::signals::Signals;
use crate::tailer::STALL_LIMIT;
use crate::watchdog::Watchdog;

/// Exit status for fatal errors and abnormal upstream termination.
pub const FATAL_EXIT: i32 = 42;

/// Exit status after SIGINT/SIGTERM when DAGMan has not finished.
pub const INTERRUPTED_EXIT: i32 = 1;

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine log directory")]
    NoLogDir,

    #[error("Failed to acquire lock: tailstatd already running for this workflow?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind query socket: {0}")]
    BindFailed(#[source] std::io::Error),

    #[error("Log rotation exhausted for {0}")]
    RotationExhausted(PathBuf),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Jobstate log error: {0}")]
    Jobstate(#[from] JobstateLogError),

    #[error("Removal store error: {0}")]
    Removals(#[from] RemovalStoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Collaborators handed to [`startup`].
pub struct Adapters<Q, P, M, C> {
    pub queue: Q,
    pub probe: P,
    pub metrics: M,
    pub clock: C,
    pub submit: Box<dyn SubmitFileReader>,
}

/// Everything the event loop owns.
pub struct Daemon<Q: QueueManager, P: ProcessProbe, M: MetricsSink, C: Clock> {
    pub config: Config,
    pub state: WorkflowState,
    extractor: Extractor,
    jobstate: JobstateLog,
    submit: Box<dyn SubmitFileReader>,
    probe: P,
    metrics: M,
    clock: C,
    watchdog: Option<Watchdog<Q>>,
    server: Option<QueryServer>,
    signals: Option<Signals>,
    level: Option<LevelControl>,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    lock_file: Option<File>,
    backoff_unit: Duration,
    stall_limit: u32,
    started_ms: u64,
    terminate: Option<i32>,
    dagman_pid: Option<u32>,
    condor_log: Option<PathBuf>,
    shutdown: Option<&'static str>,
}

/// Open every run-directory resource the daemon needs.
///
/// Outside replay mode this also takes the run-directory lock, opens the
/// removal store and binds the query server.
pub fn startup<Q, P, M, C>(
    config: Config,
    adapters: Adapters<Q, P, M, C>,
) -> Result<Daemon<Q, P, M, C>, LifecycleError>
where
    Q: QueueManager,
    P: ProcessProbe,
    M: MetricsSink,
    C: Clock,
{
    match startup_inner(&config, adapters) {
        Ok(daemon) => Ok(daemon),
        Err(e) => {
            // The lock, socket and pid files belong to the running daemon
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(&config);
            }
            Err(e)
        }
    }
}

fn startup_inner<Q, P, M, C>(
    config: &Config,
    adapters: Adapters<Q, P, M, C>,
) -> Result<Daemon<Q, P, M, C>, LifecycleError>
where
    Q: QueueManager,
    P: ProcessProbe,
    M: MetricsSink,
    C: Clock,
{
    let Adapters {
        queue,
        probe,
        metrics,
        clock,
        submit,
    } = adapters;
    let now = clock.epoch_secs();

    info!(
        pid = std::process::id(),
        out = %config.out_file.display(),
        replay = config.replay,
        "starting"
    );
    if let Some(delay) = config.millisleep {
        info!(millisleep = delay.as_millis() as u64, "pausing between log lines");
    }

    std::fs::create_dir_all(&config.run_dir)?;

    // Acquire lock file FIRST so a second daemon touches nothing
    let lock_file = if config.replay {
        None
    } else {
        let lock_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&config.lock_path)?;
        lock_file
            .try_lock_exclusive()
            .map_err(LifecycleError::LockFailed)?;
        let mut lock_file = lock_file;
        lock_file.set_len(0)?;
        writeln!(lock_file, "{}", std::process::id())?;
        Some(lock_file)
    };

    let mut jobstate = JobstateLog::open(&config.jobstate_path)?;
    jobstate.marker(now, InternalMarker::TailstatdStarted)?;

    let (watchdog, server) = if config.replay {
        (None, None)
    } else {
        let removals = RemovalAttempts::open(&config.removals_path)?;
        if !removals.is_empty() {
            info!(pending = removals.len(), "resuming removal attempts");
        }
        let watchdog = Watchdog::new(queue, removals, config.watchdog, now);
        let server =
            QueryServer::bind(&config.discovery_path).map_err(LifecycleError::BindFailed)?;
        (Some(watchdog), Some(server))
    };
    if config.watchdog.enabled() && !config.replay {
        info!(
            interval = config.watchdog.interval.as_secs(),
            threshold = config.watchdog.threshold,
            lie_factor = config.watchdog.lie_factor,
            "starvation watchdog enabled"
        );
    }

    let mut daemon = Daemon {
        state: WorkflowState::new(config.workflow_id.clone()),
        extractor: Extractor::new(config.adjustment),
        jobstate,
        submit,
        probe,
        metrics,
        started_ms: clock.epoch_ms(),
        clock,
        watchdog,
        server,
        signals: None,
        level: None,
        lock_file,
        backoff_unit: crate::env::backoff_unit(),
        stall_limit: STALL_LIMIT,
        terminate: None,
        dagman_pid: None,
        condor_log: None,
        shutdown: None,
        config: config.clone(),
    };
    daemon.emit(metrics::WORKFLOW_PLAN, now, Vec::new());
    Ok(daemon)
}

/// Remove files a failed startup may have left behind.
fn cleanup_on_failure(config: &Config) {
    if config.replay {
        return;
    }
    for path in [&config.discovery_path, &config.lock_path] {
        if path.exists() {
            let _ = std::fs::remove_file(path);
        }
    }
}

impl<Q, P, M, C> Daemon<Q, P, M, C>
where
    Q: QueueManager,
    P: ProcessProbe,
    M: MetricsSink,
    C: Clock,
{
    /// Observe SIGINT/SIGTERM/SIGHUP/SIGUSR1/SIGUSR2 from now on.
    pub fn with_signals(mut self, signals: Signals) -> Self {
        self.signals = Some(signals);
        self
    }

    pub fn with_level_control(mut self, level: LevelControl) -> Self {
        self.level = Some(level);
        self
    }

    /// Length of one backoff second.
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Idle polls without growth before the loop gives up.
    pub fn with_stall_limit(mut self, polls: u32) -> Self {
        self.stall_limit = polls;
        self
    }

    /// DAGMan's exit code, once it reported one.
    pub fn terminate(&self) -> Option<i32> {
        self.terminate
    }

    pub fn dagman_pid(&self) -> Option<u32> {
        self.dagman_pid
    }

    pub fn query_addr(&self) -> Option<std::net::SocketAddr> {
        self.server.as_ref().map(QueryServer::local_addr)
    }

    pub fn removals(&self) -> Option<&RemovalAttempts> {
        self.watchdog.as_ref().map(Watchdog::removals)
    }

    /// Exit status for a loop that stopped for `reason`.
    pub fn exit_code(&self, reason: &StopReason) -> i32 {
        self.terminate.unwrap_or(match reason {
            StopReason::Signal(_) => INTERRUPTED_EXIT,
            _ => FATAL_EXIT,
        })
    }

    /// Finalize the run and return the process exit status.
    ///
    /// Pending queries are answered before the discovery file goes away;
    /// the jobstate log always receives its closing marker.
    pub async fn shutdown(mut self, reason: StopReason) -> i32 {
        let code = self.exit_code(&reason);
        info!(?reason, code, "shutting down");

        if let Some(server) = self.server.take() {
            let served = server.drain(&self.state).await;
            if served > 0 {
                info!(served, "answered remaining queries");
            }
            server.close();
        }

        if !self.config.replay {
            let dump = tsd_daemon::site_dump(&self.state);
            if let Err(e) = std::fs::write(&self.config.sitedump_path, dump) {
                warn!(path = %self.config.sitedump_path.display(), error = %e, "failed to write site dump");
            }
        }

        let now_ms = self.clock.epoch_ms();
        let now = (now_ms / 1000) as i64;
        self.marker(now, InternalMarker::TailstatdFinished(code));

        if !self.config.replay {
            if let Some(condor_log) = &self.condor_log {
                let alias = alias_for(&self.config.out_file, &self.config.run_dir);
                copy_back(&alias, condor_log);
            }
            if self.terminate.is_some() {
                let duration = now_ms.saturating_sub(self.started_ms) as f64 / 1000.0;
                let done = format!("{} {:.3}\n", iso_long(now), duration);
                if let Err(e) = std::fs::write(&self.config.done_path, done) {
                    warn!(path = %self.config.done_path.display(), error = %e, "failed to write done file");
                }
            }
        }

        if let Some(watchdog) = self.watchdog.take() {
            let removals = watchdog.into_removals();
            if code == 0 {
                if let Err(e) = removals.destroy() {
                    warn!(error = %e, "failed to delete removal store");
                }
            }
        }

        if self.lock_file.take().is_some() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        info!(code, "tailstatd finished");
        code
    }

    fn marker(&mut self, stamp: i64, marker: InternalMarker) {
        if let Err(e) = self.jobstate.marker(stamp, marker) {
            warn!(%marker, error = %e, "failed to append marker");
        }
    }

    /// Emit a metrics event; the workflow id and timestamp lead the fields.
    fn emit(&self, event: &str, stamp: i64, fields: Vec<(&str, String)>) {
        if !self.config.metrics {
            return;
        }
        let mut all = Vec::with_capacity(fields.len() + 2);
        all.push(("wf.id", self.state.workflow.id.clone()));
        all.push(("ts", stamp.to_string()));
        all.extend(fields);
        self.metrics.emit(event, &all);
    }
}

#[cfg(test)]
#[path = "../lifecycle_tests/mod.rs"]
mod tests;
