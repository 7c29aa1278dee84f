// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single-threaded tail loop.
//!
//! Every suspension point is bounded: query checks, per-line pauses and
//! backoff sleeps all race the query listener and the signal streams, so
//! queries are answered while idle and signals are seen between batches.

use std::future::pending;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tracing::{debug, error, info, trace, warn};
use tsd_adapters::{MetricsSink, ProcessProbe, QueueManager};
use tsd_core::Clock;

use super::{Daemon, FATAL_EXIT};
use crate::listener::{self, QueryServer};
use crate::signals::{SignalEvent, Signals};
use crate::tailer::{backoff_secs, LogTailer, TailPoll, PROBE_AFTER};

/// Tries for an out file that does not exist yet.
pub const OUT_FILE_ATTEMPTS: u32 = 100;

/// Wait for a pending query at the top of each iteration.
const CHECK_WAIT: Duration = Duration::from_millis(1);

/// Why the tail loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// DAGMan finished and the file stopped growing.
    Finished,
    /// The DAGMan process vanished while the log was idle.
    UpstreamGone,
    /// No growth for more polls than the stall limit allows.
    Stalled,
    Truncated,
    Signal(&'static str),
    /// The out file never appeared.
    OutFileMissing,
    ReadError,
}

async fn next_signal(signals: Option<&mut Signals>) -> SignalEvent {
    match signals {
        Some(signals) => signals.recv().await,
        None => pending().await,
    }
}

async fn next_connection(server: Option<&QueryServer>) -> io::Result<(TcpStream, SocketAddr)> {
    match server {
        Some(server) => server.accept().await,
        None => pending().await,
    }
}

impl<Q, P, M, C> Daemon<Q, P, M, C>
where
    Q: QueueManager,
    P: ProcessProbe,
    M: MetricsSink,
    C: Clock,
{
    /// Wait for the out file, then tail it until a stop condition.
    pub async fn run(&mut self) -> StopReason {
        match self.open_out_file().await {
            Ok(mut tailer) => self.tail(&mut tailer).await,
            Err(reason) => reason,
        }
    }

    async fn open_out_file(&mut self) -> Result<LogTailer, StopReason> {
        let path = self.config.out_file.clone();
        let mut attempt = 0;
        loop {
            match LogTailer::open(&path) {
                Ok(tailer) => return Ok(tailer),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    if self.config.replay || attempt >= OUT_FILE_ATTEMPTS {
                        error!(out = %path.display(), "out file never made an appearance");
                        return Err(StopReason::OutFileMissing);
                    }
                    attempt += 1;
                    debug!(attempt, out = %path.display(), "waiting for out file");
                    self.idle(self.backoff(attempt)).await;
                    if let Some(signal) = self.shutdown {
                        return Err(StopReason::Signal(signal));
                    }
                }
                Err(e) => {
                    error!(out = %path.display(), error = %e, "cannot open out file");
                    return Err(StopReason::ReadError);
                }
            }
        }
    }

    /// Tail `tailer` until a stop condition.
    pub async fn tail(&mut self, tailer: &mut LogTailer) -> StopReason {
        let mut idle: u32 = 0;
        loop {
            if let Some(signal) = self.shutdown {
                return StopReason::Signal(signal);
            }
            self.check_watchdog().await;
            self.check_query(CHECK_WAIT).await;

            let poll = match tailer.poll() {
                Ok(poll) => poll,
                Err(e) => {
                    error!(out = %tailer.path().display(), error = %e, "cannot stat out file");
                    return StopReason::ReadError;
                }
            };
            match poll {
                TailPoll::Lines(lines) => {
                    trace!(lines = lines.len(), offset = tailer.offset(), "processing chunk");
                    for line in &lines {
                        self.process_line(line);
                        if let Some(delay) = self.config.millisleep {
                            self.idle(delay).await;
                        }
                    }
                    idle = 0;
                }
                TailPoll::EofRace => debug!("detected EOF, resetting position"),
                TailPoll::Truncated { size, offset } => {
                    warn!(size, offset, "file truncated, time to exit");
                    return StopReason::Truncated;
                }
                TailPoll::Unchanged => {
                    if self.terminate.is_some() {
                        return StopReason::Finished;
                    }
                    if idle > PROBE_AFTER && !self.upstream_alive().await {
                        error!("DAGMan is gone! Sudden death syndrome detected");
                        self.terminate = Some(FATAL_EXIT);
                        return StopReason::UpstreamGone;
                    }
                    idle += 1;
                    if idle > self.stall_limit {
                        error!(idle, "too long without action, giving up");
                        return StopReason::Stalled;
                    }
                    self.idle(self.backoff(idle)).await;
                }
            }
        }
    }

    fn backoff(&self, idle: u32) -> Duration {
        self.backoff_unit * backoff_secs(idle) as u32
    }

    async fn upstream_alive(&self) -> bool {
        match self.dagman_pid {
            Some(pid) => self.probe.is_alive(pid).await,
            None => true,
        }
    }

    async fn check_watchdog(&mut self) {
        let now = self.clock.epoch_secs();
        if let Some(watchdog) = self.watchdog.as_mut() {
            if watchdog.is_due(now) {
                watchdog.check(&self.state, now).await;
            }
        }
    }

    async fn check_query(&mut self, wait: Duration) {
        if let Some(server) = &self.server {
            server.check(&self.state, wait).await;
        }
    }

    /// Sleep for `duration` while answering queries and watching signals.
    ///
    /// A shutdown signal cuts the sleep short and is remembered for the
    /// loop to act on.
    async fn idle(&mut self, duration: Duration) {
        let deadline = tokio::time::Instant::now() + duration;
        loop {
            tokio::select! {
                event = next_signal(self.signals.as_mut()) => {
                    self.on_signal(event);
                    if self.shutdown.is_some() {
                        return;
                    }
                }
                conn = next_connection(self.server.as_ref()) => match conn {
                    Ok((stream, peer)) => listener::serve(stream, peer, &self.state).await,
                    Err(e) => warn!(error = %e, "accept failed"),
                },
                _ = tokio::time::sleep_until(deadline) => return,
            }
        }
    }

    fn on_signal(&mut self, event: SignalEvent) {
        match event {
            SignalEvent::Shutdown(name) => {
                info!(signal = name, "shutdown requested");
                self.shutdown = Some(name);
            }
            SignalEvent::Hangup => debug!("ignoring SIGHUP"),
            SignalEvent::Louder | SignalEvent::Quieter => match self.level.as_mut() {
                Some(level) => level.step(event == SignalEvent::Louder),
                None => debug!(?event, "no runtime verbosity control"),
            },
        }
    }
}
