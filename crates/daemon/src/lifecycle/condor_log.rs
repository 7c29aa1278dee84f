// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local alias for Condor's common user log.
//!
//! DAGMan may write the common log somewhere outside the run directory. The
//! daemon keeps `<run>/<dag>.log` pointing at it while running and replaces
//! the link with a real copy at shutdown.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use tsd_adapters::out_stem;

#[allow(clippy::expect_used)]
static DAG_EXTENSIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\.(?:rescue|dag))+$").expect("constant regex pattern is valid")
});

/// `<run>/x.dag.dagman.out` and rescue variants map to `<run>/x.log`.
pub fn alias_for(out_file: &Path, run_dir: &Path) -> PathBuf {
    let stem = out_stem(out_file);
    let base = DAG_EXTENSIONS.replace(&stem, "");
    run_dir.join(format!("{base}.log"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasOutcome {
    AlreadyLinked,
    /// A readable plain file is already in place and left alone.
    PlainFile,
    Linked,
    /// The common log exists but cannot be read.
    Unreadable,
    Failed,
}

/// Point `alias` at `condor_log`, moving an unreadable leftover aside.
pub fn reconcile_alias(alias: &Path, condor_log: &Path) -> AliasOutcome {
    let alias_meta = fs::symlink_metadata(alias).ok();
    if alias_meta.as_ref().is_some_and(|m| m.file_type().is_symlink()) {
        info!(alias = %alias.display(), "symlink already exists");
        return AliasOutcome::AlreadyLinked;
    }
    if File::open(alias).is_ok() {
        info!(alias = %alias.display(), "regular file, not touching");
        return AliasOutcome::PlainFile;
    }
    if condor_log.exists() && File::open(condor_log).is_err() {
        warn!(condor_log = %condor_log.display(), "exists but is not readable");
        return AliasOutcome::Unreadable;
    }

    if alias_meta.is_some() {
        let bak = backup_path(alias);
        if let Err(e) = fs::rename(alias, &bak) {
            warn!(alias = %alias.display(), error = %e, "failed to move alias aside");
        }
    }
    match std::os::unix::fs::symlink(condor_log, alias) {
        Ok(()) => {
            info!(alias = %alias.display(), target = %condor_log.display(), "created symlink");
            AliasOutcome::Linked
        }
        Err(e) => {
            warn!(alias = %alias.display(), error = %e, "unable to symlink");
            AliasOutcome::Failed
        }
    }
}

/// Replace `alias` with a copy of `condor_log`.
///
/// Only absolute paths to readable regular files are copied. Returns whether
/// the alias now holds the copy.
pub fn copy_back(alias: &Path, condor_log: &Path) -> bool {
    if !condor_log.is_absolute() || !condor_log.is_file() || File::open(condor_log).is_err() {
        return false;
    }
    match replace_with_copy(alias, condor_log) {
        Ok(()) => {
            info!(alias = %alias.display(), "copied common log into run directory");
            true
        }
        Err(e) => {
            warn!(alias = %alias.display(), error = %e, "failed to copy common log");
            false
        }
    }
}

fn replace_with_copy(alias: &Path, condor_log: &Path) -> io::Result<()> {
    let copy = PathBuf::from(format!("{}.copy", alias.display()));
    fs::copy(condor_log, &copy)?;
    match fs::remove_file(alias) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    fs::rename(&copy, alias)
}

fn backup_path(alias: &Path) -> PathBuf {
    PathBuf::from(format!("{}.bak", alias.display()))
}

#[cfg(test)]
#[path = "condor_log_tests.rs"]
mod tests;
