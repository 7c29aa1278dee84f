// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only writer for `jobstate.log`.
//!
//! Every line is handed to the kernel in a single `write` on an `O_APPEND`
//! descriptor, so concurrent readers never observe a half-written record
//! and nothing is lost if the daemon dies between events.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;
use tsd_core::{marker_line, InternalMarker, JobstateRecord};

#[derive(Debug, Error)]
pub enum JobstateLogError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("write failed: {0}")]
    Write(#[from] io::Error),
}

/// Destination for canonical jobstate lines.
pub trait JobstateSink {
    /// Append one line; the newline is added by the sink.
    fn append_line(&mut self, line: &str) -> Result<(), JobstateLogError>;

    fn append(&mut self, record: &JobstateRecord) -> Result<(), JobstateLogError> {
        self.append_line(&record.to_string())
    }

    fn marker(&mut self, stamp: i64, marker: InternalMarker) -> Result<(), JobstateLogError> {
        self.append_line(&marker_line(stamp, marker))
    }
}

/// In-memory sink, used by tests and dry runs.
impl JobstateSink for Vec<String> {
    fn append_line(&mut self, line: &str) -> Result<(), JobstateLogError> {
        self.push(line.to_string());
        Ok(())
    }
}

/// File-backed jobstate log, opened for append (created if missing).
#[derive(Debug)]
pub struct JobstateLog {
    file: File,
    path: PathBuf,
}

impl JobstateLog {
    pub fn open(path: &Path) -> Result<Self, JobstateLogError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| JobstateLogError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        }
        if !path.exists() {
            warn!(path = %path.display(), "creating new jobstate log");
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| JobstateLogError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl JobstateSink for JobstateLog {
    fn append_line(&mut self, line: &str) -> Result<(), JobstateLogError> {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        self.file.write_all(buf.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "jobstate_log_tests.rs"]
mod tests;
