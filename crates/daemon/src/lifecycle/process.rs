// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Applying extracted log lines to the daemon.

use std::path::PathBuf;

use tracing::{debug, info, warn};
use tsd_adapters::{metrics, MetricsSink, ProcessProbe, QueueManager};
use tsd_core::{names, Clock, InternalMarker, JobEvent, LogEvent, ParsedLine};
use tsd_storage::Recorded;

use super::condor_log::{alias_for, reconcile_alias};
use super::Daemon;

impl<Q, P, M, C> Daemon<Q, P, M, C>
where
    Q: QueueManager,
    P: ProcessProbe,
    M: MetricsSink,
    C: Clock,
{
    /// Run one out-file line through the extractor and apply its event.
    pub fn process_line(&mut self, line: &str) {
        if let Some(ParsedLine { stamp, event }) = self.extractor.extract_now(line) {
            self.apply(stamp, event);
        }
    }

    pub fn apply(&mut self, stamp: i64, event: LogEvent) {
        match event {
            LogEvent::Job(event) => self.record_job_event(stamp, event),
            LogEvent::RetryExhausted { job_id, retries } => {
                self.state.flag_retries(&job_id, retries)
            }
            LogEvent::DagmanFinished { status } => {
                if let Some(previous) = self.terminate {
                    debug!(previous, status, "DAGMan reported finishing again");
                }
                info!(status, "DAGMan finished");
                self.terminate = Some(status);
                self.marker(stamp, InternalMarker::DagmanFinished);
                self.emit(
                    metrics::WORKFLOW_END,
                    stamp,
                    vec![("status", status.to_string())],
                );
            }
            LogEvent::DagmanPid { pid } => {
                if self.config.replay {
                    debug!(pid, "replay mode, not monitoring DAGMan");
                } else {
                    self.dagman_pid = Some(pid);
                }
                info!(pid, "DAGMan runs at pid");
                self.marker(stamp, InternalMarker::DagmanStarted);
                self.emit(metrics::WORKFLOW_START, stamp, Vec::new());
            }
            LogEvent::CondorVersion { version, major } => {
                info!(%version, %major, "using DAGMan version");
            }
            LogEvent::CondorLog { path } => {
                info!(path = %path, "Condor writes its log file here");
                let path = PathBuf::from(path);
                if !self.config.replay {
                    let alias = alias_for(&self.config.out_file, &self.config.run_dir);
                    reconcile_alias(&alias, &path);
                }
                self.condor_log = Some(path);
            }
            LogEvent::MultilineFiles => debug!("expecting multi-line log file listing"),
        }
    }

    fn record_job_event(&mut self, stamp: i64, event: JobEvent) {
        let plan = if event.kind == names::SUBMIT {
            self.submit.plan(&event.job_id, stamp)
        } else {
            None
        };
        let recorded = self
            .state
            .record_event(stamp, &event, plan, &mut self.jobstate);
        if recorded.permanent_failure {
            warn!(job_id = %event.job_id, "job failed permanently");
        }
        self.emit_job_metrics(stamp, &event, &recorded);
    }

    fn emit_job_metrics(&self, stamp: i64, event: &JobEvent, recorded: &Recorded) {
        let job_id = event.job_id.clone();
        let sched_id = event
            .queue_id
            .clone()
            .or_else(|| {
                self.state
                    .workflow
                    .last_queue_id(&event.job_id)
                    .map(str::to_string)
            })
            .unwrap_or_default();
        let job = self.state.workflow.job(&event.job_id);
        let text = |value: Option<i64>| value.map(|v| v.to_string()).unwrap_or_default();

        match event.kind.as_str() {
            names::SUBMIT => self.emit(
                metrics::JOB_MAINJOB_START,
                stamp,
                vec![
                    ("job_id", job_id.clone()),
                    ("sched_id", sched_id.clone()),
                    ("site", recorded.record.site.clone().unwrap_or_default()),
                    (
                        "job_type",
                        job.and_then(|j| j.job_type.clone()).unwrap_or_default(),
                    ),
                    (
                        "submit_seq",
                        text(recorded.registration.map(|r| i64::from(r.seq()))),
                    ),
                ],
            ),
            names::JOB_SUCCESS | names::JOB_FAILURE => self.emit(
                metrics::JOB_MAINJOB_END,
                stamp,
                vec![
                    ("job_id", job_id.clone()),
                    ("sched_id", sched_id.clone()),
                    (
                        "exitcode",
                        text(job.and_then(|j| j.main_job_exit_code).map(i64::from)),
                    ),
                    ("duration", text(job.and_then(|j| j.main_job_runtime(stamp)))),
                ],
            ),
            names::PRE_SCRIPT_STARTED => {
                self.emit(metrics::JOB_PRESCRIPT_START, stamp, vec![("job_id", job_id.clone())])
            }
            names::PRE_SCRIPT_SUCCESS | names::PRE_SCRIPT_FAILURE => {
                let run = job.map(|j| j.pre_script).unwrap_or_default();
                self.emit(
                    metrics::JOB_PRESCRIPT_END,
                    stamp,
                    vec![
                        ("job_id", job_id.clone()),
                        ("exitcode", text(event.status.map(i64::from))),
                        ("duration", text(run.duration())),
                    ],
                )
            }
            names::POST_SCRIPT_STARTED => {
                self.emit(metrics::JOB_POSTSCRIPT_START, stamp, vec![("job_id", job_id.clone())])
            }
            names::POST_SCRIPT_SUCCESS | names::POST_SCRIPT_FAILURE => {
                let run = job.map(|j| j.post_script).unwrap_or_default();
                self.emit(
                    metrics::JOB_POSTSCRIPT_END,
                    stamp,
                    vec![
                        ("job_id", job_id.clone()),
                        ("exitcode", text(event.status.map(i64::from))),
                        ("duration", text(run.duration())),
                    ],
                )
            }
            _ => {}
        }

        self.emit(
            metrics::JOB_STATE,
            stamp,
            vec![
                ("job_id", job_id),
                ("state", event.kind.clone()),
                ("sched_id", sched_id),
            ],
        );
    }
}
