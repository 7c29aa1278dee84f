// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent per-queue-id removal retry counters.
//!
//! The store is written through on every change (tmp file + rename) so a
//! restarted daemon picks up where a crashed one left off.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum RemovalStoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// queue id → number of removal attempts acknowledged but not yet effective.
#[derive(Debug)]
pub struct RemovalAttempts {
    path: PathBuf,
    attempts: BTreeMap<String, u32>,
}

impl RemovalAttempts {
    /// Open the store at `path`, starting empty when it does not exist.
    ///
    /// A corrupt store is moved aside to `.bak` and replaced by an empty one.
    pub fn open(path: &Path) -> Result<Self, RemovalStoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let attempts = if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            match serde_json::from_reader(reader) {
                Ok(attempts) => attempts,
                Err(e) => {
                    let bak_path = rotate_bak_path(path);
                    warn!(
                        error = %e,
                        path = %path.display(),
                        bak = %bak_path.display(),
                        "Corrupt removal store, moving to .bak and starting fresh",
                    );
                    fs::rename(path, &bak_path)?;
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        let store = Self {
            path: path.to_path_buf(),
            attempts,
        };
        store.persist()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, queue_id: &str) -> u32 {
        self.attempts.get(queue_id).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    /// Bump the counter for `queue_id` and return the new value.
    pub fn increment(&mut self, queue_id: &str) -> Result<u32, RemovalStoreError> {
        let count = self.attempts.entry(queue_id.to_string()).or_insert(0);
        *count += 1;
        let count = *count;
        self.persist()?;
        Ok(count)
    }

    /// Forget `queue_id` after a successful removal.
    pub fn clear(&mut self, queue_id: &str) -> Result<(), RemovalStoreError> {
        if self.attempts.remove(queue_id).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    /// Delete the backing file. Used on clean shutdown.
    pub fn destroy(self) -> Result<(), RemovalStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn persist(&self) -> Result<(), RemovalStoreError> {
        let tmp_path = self.path.with_extension("tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, &self.attempts)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

#[cfg(test)]
#[path = "removals_tests.rs"]
mod tests;
