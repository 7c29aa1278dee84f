// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kill -0` based liveness probe.

use super::ProcessProbe;
use crate::subprocess::{run_with_timeout, PROBE_TIMEOUT};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

/// Probes a pid by sending it signal 0.
///
/// A probe that cannot be run at all counts as "alive": giving up on a
/// workflow because `kill` is missing would be worse than waiting.
#[derive(Clone, Copy, Debug, Default)]
pub struct KillProbe;

impl KillProbe {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessProbe for KillProbe {
    async fn is_alive(&self, pid: u32) -> bool {
        let mut cmd = Command::new("kill");
        cmd.args(["-0", &pid.to_string()])
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        match run_with_timeout(cmd, PROBE_TIMEOUT, "kill -0").await {
            Ok(output) => output.status.success(),
            Err(e) => {
                tracing::warn!(pid, error = %e, "liveness probe failed to run");
                true
            }
        }
    }
}

#[cfg(test)]
#[path = "kill_tests.rs"]
mod tests;
