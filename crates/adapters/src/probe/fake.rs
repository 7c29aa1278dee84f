// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake liveness probe for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::ProcessProbe;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

struct FakeProbeState {
    alive: HashSet<u32>,
    probes: Vec<u32>,
}

/// Probe whose answers are set by the test. Unknown pids are dead.
#[derive(Clone)]
pub struct FakeProcessProbe {
    inner: Arc<Mutex<FakeProbeState>>,
}

impl Default for FakeProcessProbe {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeProbeState {
                alive: HashSet::new(),
                probes: Vec::new(),
            })),
        }
    }
}

impl FakeProcessProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_alive(&self, pid: u32, alive: bool) {
        let mut inner = self.inner.lock();
        if alive {
            inner.alive.insert(pid);
        } else {
            inner.alive.remove(&pid);
        }
    }

    /// Pids probed so far, in order.
    pub fn probes(&self) -> Vec<u32> {
        self.inner.lock().probes.clone()
    }
}

#[async_trait]
impl ProcessProbe for FakeProcessProbe {
    async fn is_alive(&self, pid: u32) -> bool {
        let mut inner = self.inner.lock();
        inner.probes.push(pid);
        inner.alive.contains(&pid)
    }
}
