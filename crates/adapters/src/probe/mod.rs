// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness probes for the DAGMan process

mod kill;

pub use kill::KillProbe;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeProcessProbe;

use async_trait::async_trait;

/// Answers whether a process id still names a live process.
#[async_trait]
pub trait ProcessProbe: Clone + Send + Sync + 'static {
    async fn is_alive(&self, pid: u32) -> bool;
}
