// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Condor queue-job identifiers (`cluster.proc`).

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

#[allow(clippy::expect_used)]
static VALID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)?$").expect("constant regex pattern is valid"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueIdError {
    #[error("invalid queue id: {0:?}")]
    Invalid(String),
}

/// A validated `cluster[.proc]` identifier suitable for handing to the queue
/// manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueId(String);

impl QueueId {
    /// Normalize `cluster.proc.subproc` down to `cluster.proc`, then validate
    /// against `digits[.digits]`.
    pub fn parse(raw: &str) -> Result<Self, QueueIdError> {
        let raw = raw.trim();
        let normalized = match raw.match_indices('.').nth(1) {
            Some((second_dot, _)) => &raw[..second_dot],
            None => raw,
        };
        if VALID.is_match(normalized) {
            Ok(Self(normalized.to_string()))
        } else {
            Err(QueueIdError::Invalid(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[path = "queue_id_tests.rs"]
mod tests;
