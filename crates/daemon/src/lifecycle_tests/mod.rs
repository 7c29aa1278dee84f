// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

use std::path::Path;

use clap::Parser;
use tempfile::{tempdir, TempDir};
use tsd_adapters::{FakeMetricsSink, FakeProcessProbe, FakeQueueManager, FakeSubmitFiles};
use tsd_core::{FakeClock, LogEvent};

use crate::config::Args;

mod event_processing;
mod startup_shutdown;
mod tailing;

type TestDaemon = Daemon<FakeQueueManager, FakeProcessProbe, FakeMetricsSink, FakeClock>;

const OUT: &str = "wf.dag.dagman.out";
const START: i64 = 1_700_000_000;

struct Fixture {
    dir: TempDir,
    config: Config,
    queue: FakeQueueManager,
    probe: FakeProcessProbe,
    metrics: FakeMetricsSink,
    clock: FakeClock,
    submit: FakeSubmitFiles,
}

impl Fixture {
    fn new(extra: &[&str]) -> Self {
        let dir = tempdir().unwrap();
        let out = dir.path().join(OUT);
        let mut argv = vec!["tailstatd", "-n", "-C", "wf_uuid=wf-test"];
        argv.extend_from_slice(extra);
        let out_arg = out.to_string_lossy().into_owned();
        argv.push(&out_arg);
        let config = Config::from_args(&Args::try_parse_from(argv).unwrap()).unwrap();

        Self {
            dir,
            config,
            queue: FakeQueueManager::new(),
            probe: FakeProcessProbe::new(),
            metrics: FakeMetricsSink::new(),
            clock: FakeClock::at_secs(START),
            submit: FakeSubmitFiles::new(),
        }
    }

    fn replay() -> Self {
        Self::new(&["-r"])
    }

    fn try_start(&self) -> Result<TestDaemon, LifecycleError> {
        startup(
            self.config.clone(),
            Adapters {
                queue: self.queue.clone(),
                probe: self.probe.clone(),
                metrics: self.metrics.clone(),
                clock: self.clock.clone(),
                submit: Box::new(self.submit.clone()),
            },
        )
        .map(|d| d.with_backoff_unit(Duration::from_millis(1)))
    }

    fn start(&self) -> TestDaemon {
        self.try_start().unwrap()
    }

    fn path(&self, name: &str) -> std::path::PathBuf {
        self.dir.path().join(name)
    }

    fn write_out(&self, lines: &[&str]) {
        let mut text = lines.join("\n");
        text.push('\n');
        std::fs::write(self.path(OUT), text).unwrap();
    }

    /// Jobstate lines with the leading timestamp removed.
    fn jobstate(&self) -> Vec<String> {
        read_lines(&self.config.jobstate_path)
            .into_iter()
            .map(|line| match line.split_once(' ') {
                Some((_, rest)) => rest.to_string(),
                None => line,
            })
            .collect()
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}
