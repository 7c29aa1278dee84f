// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Growth-driven reader for DAGMan's out file.
//!
//! The file is never read speculatively: every poll compares its size with
//! the read position and reads only when it grew. The committed offset moves
//! past complete lines only; a trailing partial line stays buffered until
//! its newline arrives.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Bytes read per poll.
pub const CHUNK_SIZE: usize = 32 * 1024;

/// Idle polls before the upstream process is probed.
pub const PROBE_AFTER: u32 = 10;

/// Idle polls after which the daemon gives up (about a day at the slow rate).
pub const STALL_LIMIT: u32 = 17_280;

/// Seconds to sleep after `idle` consecutive polls without growth.
pub fn backoff_secs(idle: u32) -> u64 {
    match idle {
        0..=4 => 1,
        5..=49 => 5,
        50..=499 => 30,
        _ => 60,
    }
}

/// Splits a byte stream into lines independently of how it was chunked.
#[derive(Debug, Default)]
pub struct LineBuffer {
    partial: Vec<u8>,
}

impl LineBuffer {
    /// Append `bytes` and return every line it completed, without the
    /// trailing `\n` or `\r\n`.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.partial.extend_from_slice(bytes);
        let Some(last_newline) = self.partial.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };

        let rest = self.partial.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.partial, rest);
        complete[..last_newline]
            .split(|b| *b == b'\n')
            .map(|line| {
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                String::from_utf8_lossy(line).into_owned()
            })
            .collect()
    }

    /// Bytes held back waiting for a newline.
    pub fn pending(&self) -> usize {
        self.partial.len()
    }
}

/// Outcome of one [`LogTailer::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailPoll {
    /// The file grew. May be empty when the new bytes hold no newline yet.
    Lines(Vec<String>),
    Unchanged,
    /// The size said "grown" but the read returned nothing.
    EofRace,
    /// The file is smaller than what was already read.
    Truncated { size: u64, offset: u64 },
}

#[derive(Debug)]
pub struct LogTailer {
    path: PathBuf,
    file: File,
    offset: u64,
    buffer: LineBuffer,
}

impl LogTailer {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            file: File::open(path)?,
            offset: 0,
            buffer: LineBuffer::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// End of the last complete line handed out.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn poll(&mut self) -> io::Result<TailPoll> {
        let size = std::fs::metadata(&self.path)?.len();
        self.read_to(size)
    }

    /// Read what lies between the read position and `size`, the file size
    /// seen by the last stat.
    fn read_to(&mut self, size: u64) -> io::Result<TailPoll> {
        let read_pos = self.offset + self.buffer.pending() as u64;

        if size == read_pos {
            return Ok(TailPoll::Unchanged);
        }
        if size < read_pos {
            return Ok(TailPoll::Truncated {
                size,
                offset: read_pos,
            });
        }

        self.file.seek(SeekFrom::Start(read_pos))?;
        let mut chunk = vec![0u8; CHUNK_SIZE];
        let n = self.file.read(&mut chunk)?;
        if n == 0 {
            return Ok(TailPoll::EofRace);
        }

        let lines = self.buffer.push(&chunk[..n]);
        self.offset = read_pos + n as u64 - self.buffer.pending() as u64;
        Ok(TailPoll::Lines(lines))
    }
}

#[cfg(test)]
#[path = "tailer_tests.rs"]
mod tests;
