// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon log file setup, rotation and runtime verbosity.

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

use crate::config::{Config, RunMode};
use crate::lifecycle::LifecycleError;

/// Rotation slots `.000` through `.999`.
pub const MAX_ROTATIONS: u32 = 1000;

const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Index into the verbosity ladder for a `-d` count.
pub fn level_for_debug(debug: u8) -> usize {
    (2 + debug as usize).min(LEVELS.len() - 1)
}

/// Runtime verbosity, stepped by SIGUSR1/SIGUSR2.
pub struct LevelControl {
    handle: reload::Handle<EnvFilter, Registry>,
    level: usize,
}

impl LevelControl {
    pub fn level(&self) -> &'static str {
        LEVELS[self.level]
    }

    /// Move one step up (`louder`) or down the ladder.
    pub fn step(&mut self, louder: bool) {
        let next = if louder {
            (self.level + 1).min(LEVELS.len() - 1)
        } else {
            self.level.saturating_sub(1)
        };
        if next == self.level {
            info!(level = self.level(), "verbosity unchanged");
            return;
        }
        match self.handle.reload(EnvFilter::new(LEVELS[next])) {
            Ok(()) => {
                self.level = next;
                info!(level = self.level(), "verbosity changed");
            }
            Err(e) => warn!(error = %e, "failed to change verbosity"),
        }
    }
}

/// Move an existing daemon log to the first free `<log>.NNN` slot.
pub fn rotate_log(path: &Path) -> Result<Option<PathBuf>, LifecycleError> {
    if !path.exists() {
        return Ok(None);
    }
    let name = path.as_os_str().to_string_lossy().into_owned();
    for n in 0..MAX_ROTATIONS {
        let dest = PathBuf::from(format!("{name}.{n:03}"));
        if !dest.exists() {
            std::fs::rename(path, &dest)?;
            return Ok(Some(dest));
        }
    }
    Err(LifecycleError::RotationExhausted(path.to_path_buf()))
}

pub fn setup_logging(config: &Config) -> Result<(WorkerGuard, LevelControl), LifecycleError> {
    let dir = config.log_path.parent().ok_or(LifecycleError::NoLogDir)?;
    std::fs::create_dir_all(dir)?;
    let file_name = config.log_path.file_name().ok_or(LifecycleError::NoLogDir)?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let level = level_for_debug(config.debug);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(LEVELS[level]));
    let (filter, handle) = reload::Layer::new(filter);

    let stderr = (config.mode == RunMode::Interactive)
        .then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(stderr)
        .init();

    Ok((guard, LevelControl { handle, level }))
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
