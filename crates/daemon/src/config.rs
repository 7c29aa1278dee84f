// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command line and derived run-directory configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{ArgAction, Parser};
use thiserror::Error;
use tsd_adapters::{dag_path_for, out_stem};

/// Watchdog cadence when neither a flag nor `-C starve.interval` sets one.
pub const DEFAULT_STARVE_INTERVAL: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot resolve {path}: {source}")]
    Path {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("-C expects KEY=VALUE, got {0:?}")]
    BadPair(String),

    #[error("invalid value {value:?} for {key}")]
    BadValue { key: String, value: String },
}

/// Tail a DAGMan out file and maintain the jobstate log.
#[derive(Parser, Debug, Clone)]
#[command(name = "tailstatd", version, about)]
pub struct Args {
    /// DAGMan's `.dagman.out` file
    pub dagman_out: PathBuf,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'd', long = "debug", action = ArgAction::Count)]
    pub debug: u8,

    /// Seconds added to every parsed timestamp
    #[arg(short = 'a', long = "adjust", default_value_t = 0, allow_hyphen_values = true)]
    pub adjust: i64,

    /// Stay in the foreground, logging to the log file only
    #[arg(short = 'N', long = "foreground")]
    pub foreground: bool,

    /// Stay in the foreground and also log to stderr
    #[arg(short = 'n', long = "no-daemon")]
    pub no_daemon: bool,

    /// Alternate jobstate log
    #[arg(short = 'j', long = "jobstate-log")]
    pub jobstate_log: Option<PathBuf>,

    /// Alternate daemon log
    #[arg(short = 'l', long = "log")]
    pub log: Option<PathBuf>,

    /// Workflow settings as KEY=VALUE (repeatable)
    #[arg(short = 'C', long = "conf", value_name = "KEY=VALUE")]
    pub conf: Vec<String>,

    /// Emit workflow metrics (default)
    #[arg(long = "metrics", overrides_with = "no_metrics")]
    pub metrics: bool,

    /// Do not emit workflow metrics
    #[arg(long = "no-metrics", overrides_with = "metrics")]
    pub no_metrics: bool,

    /// Milliseconds to pause between log lines
    #[arg(short = 'S', long = "millisleep", value_name = "MS")]
    pub millisleep: Option<u64>,

    /// Reprocess an existing log without watching DAGMan
    #[arg(short = 'r', long = "replay")]
    pub replay: bool,

    /// Seconds between starvation checks
    #[arg(long = "starve-interval", value_name = "SECS")]
    pub starve_interval: Option<u64>,

    /// Seconds a job may stay pending before removal (0 disables)
    #[arg(long = "starve-threshold", value_name = "SECS")]
    pub starve_threshold: Option<u64>,

    /// Multiple of the declared walltime a job may run (0 disables)
    #[arg(long = "lie-factor", value_name = "FACTOR")]
    pub lie_factor: Option<f64>,
}

/// How the process relates to its terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Re-spawn detached and exit.
    Daemon,
    /// `-N`: in the foreground, log file only.
    Foreground,
    /// `-n`: in the foreground, log file and stderr.
    Interactive,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchdogConfig {
    pub interval: Duration,
    /// Pending age in seconds that triggers removal. 0 disables the watchdog.
    pub threshold: u64,
    /// Walltime multiplier for running jobs. 0 disables that check.
    pub lie_factor: f64,
}

impl WatchdogConfig {
    pub fn enabled(&self) -> bool {
        self.threshold > 0
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_STARVE_INTERVAL),
            threshold: 0,
            lie_factor: 0.0,
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Absolute path of the tailed out file
    pub out_file: PathBuf,
    pub run_dir: PathBuf,
    pub dag_path: PathBuf,
    pub jobstate_path: PathBuf,
    /// `host port` discovery file for the query server
    pub discovery_path: PathBuf,
    pub removals_path: PathBuf,
    /// Lock/PID file
    pub lock_path: PathBuf,
    pub done_path: PathBuf,
    pub sitedump_path: PathBuf,
    pub log_path: PathBuf,
    pub workflow_id: String,
    pub adjustment: i64,
    pub debug: u8,
    pub mode: RunMode,
    pub replay: bool,
    pub metrics: bool,
    pub millisleep: Option<Duration>,
    pub watchdog: WatchdogConfig,
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let mut workflow_id = None;
        let mut run_dir = None;
        let mut watchdog = WatchdogConfig::default();

        for pair in &args.conf {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| ConfigError::BadPair(pair.clone()))?;
            let (key, value) = (key.trim(), value.trim());
            match key {
                "wf_uuid" => workflow_id = Some(value.to_string()),
                "run" => run_dir = Some(PathBuf::from(value)),
                "starve.interval" => {
                    watchdog.interval = Duration::from_secs(parse_value(key, value)?)
                }
                "starve.threshold" => watchdog.threshold = parse_value(key, value)?,
                "lie.factor" => watchdog.lie_factor = parse_value(key, value)?,
                _ => {}
            }
        }

        if let Some(secs) = args.starve_interval {
            watchdog.interval = Duration::from_secs(secs);
        }
        if let Some(secs) = args.starve_threshold {
            watchdog.threshold = secs;
        }
        if let Some(factor) = args.lie_factor {
            watchdog.lie_factor = factor;
        }
        if !watchdog.lie_factor.is_finite() || watchdog.lie_factor < 0.0 {
            return Err(ConfigError::BadValue {
                key: "lie factor".into(),
                value: watchdog.lie_factor.to_string(),
            });
        }

        let out_file = absolute(&args.dagman_out)?;
        let out_dir = out_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));
        let run_dir = match run_dir {
            Some(dir) => absolute(&dir)?,
            None => out_dir,
        };

        let jobstate_path = match &args.jobstate_log {
            Some(path) => absolute(path)?,
            None => run_dir.join("jobstate.log"),
        };
        let log_path = match &args.log {
            Some(path) => absolute(path)?,
            None => run_dir.join(format!("{}.tailstatd.log", out_stem(&out_file))),
        };

        let mode = if args.no_daemon {
            RunMode::Interactive
        } else if args.foreground {
            RunMode::Foreground
        } else {
            RunMode::Daemon
        };

        Ok(Self {
            dag_path: dag_path_for(&out_file, &run_dir),
            discovery_path: run_dir.join("tailstatd.sock"),
            removals_path: run_dir.join("remove.json"),
            lock_path: run_dir.join("tailstatd.pid"),
            done_path: run_dir.join("tailstatd.done"),
            sitedump_path: run_dir.join("sitedump.txt"),
            jobstate_path,
            log_path,
            out_file,
            run_dir,
            workflow_id: workflow_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            adjustment: args.adjust,
            debug: args.debug,
            mode,
            replay: args.replay,
            metrics: !args.no_metrics,
            millisleep: args
                .millisleep
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            watchdog,
        })
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::BadValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn absolute(path: &Path) -> Result<PathBuf, ConfigError> {
    std::path::absolute(path).map_err(|source| ConfigError::Path {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
