// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submit file locations from the DAG file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::UNIX_EPOCH;

use regex::Regex;
use tracing::{debug, info, warn};
use tsd_core::JobPlan;

use super::parse::parse_submit_file;
use super::SubmitFileReader;

#[allow(clippy::expect_used)]
static JOB_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)JOB\s+(\S+)\s(\S+)(\s+DONE)?").expect("constant regex pattern is valid")
});

/// Suffix DAGMan appends to the DAG file name for its out file.
pub const OUT_SUFFIX: &str = ".dagman.out";

/// Out file name without `.dagman.out`.
pub fn out_stem(out_file: &Path) -> String {
    let name = out_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.find(OUT_SUFFIX) {
        Some(idx) => name[..idx].to_string(),
        None => name,
    }
}

/// DAG file belonging to a DAGMan out file: `x.dag.dagman.out` → `<run>/x.dag`.
pub fn dag_path_for(out_file: &Path, run_dir: &Path) -> PathBuf {
    run_dir.join(out_stem(out_file))
}

/// Submit files of every DAG node that still has to run.
///
/// Nodes marked `DONE` (rescue DAGs) are left out, so lookups for them
/// return no plan.
#[derive(Debug, Default)]
pub struct DagSubmitFiles {
    submit_files: HashMap<String, PathBuf>,
}

impl DagSubmitFiles {
    /// Read `dag_file`; submit paths are resolved against `run_dir`.
    ///
    /// An unreadable DAG yields an empty table rather than an error: the
    /// daemon still tracks jobs, just without site or walltime.
    pub fn load(dag_file: &Path, run_dir: &Path) -> Self {
        match std::fs::read_to_string(dag_file) {
            Ok(text) => {
                let files = Self::parse(&text, run_dir);
                info!(dag = %dag_file.display(), jobs = files.len(), "read submit file locations");
                files
            }
            Err(e) => {
                warn!(dag = %dag_file.display(), error = %e, "unable to read DAG file");
                Self::default()
            }
        }
    }

    pub fn parse(text: &str, run_dir: &Path) -> Self {
        let mut submit_files = HashMap::new();
        for line in text.lines() {
            let Some(caps) = JOB_LINE.captures(line) else {
                continue;
            };
            if caps.get(3).is_some() {
                continue;
            }
            submit_files.insert(caps[1].to_string(), run_dir.join(&caps[2]));
        }
        Self { submit_files }
    }

    pub fn submit_file(&self, job_id: &str) -> Option<&Path> {
        self.submit_files.get(job_id).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.submit_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.submit_files.is_empty()
    }
}

impl SubmitFileReader for DagSubmitFiles {
    fn plan(&self, job_id: &str, stamp: i64) -> Option<JobPlan> {
        let path = self.submit_file(job_id)?;

        let meta = match std::fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot stat submit file");
                return None;
            }
        };
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        if stamp < mtime {
            debug!(stamp, mtime, diff = mtime - stamp, "submit file newer than event");
            info!(path = %path.display(), "skipping submit file (reparsing events)");
            return None;
        }

        match std::fs::read_to_string(path) {
            Ok(text) => Some(parse_submit_file(&text)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unable to parse submit file");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "dag_tests.rs"]
mod tests;
