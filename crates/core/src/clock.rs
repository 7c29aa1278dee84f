// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wall-clock abstraction so time-based decisions can be tested.

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock time in epoch units.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Milliseconds since the Unix epoch.
    fn epoch_ms(&self) -> u64;

    /// Whole seconds since the Unix epoch.
    fn epoch_secs(&self) -> i64 {
        (self.epoch_ms() / 1000) as i64
    }
}

/// Clock backed by the operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeClock;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::Clock;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Manually driven clock for tests.
    #[derive(Clone, Debug)]
    pub struct FakeClock {
        ms: Arc<Mutex<u64>>,
    }

    impl FakeClock {
        pub fn at_secs(secs: i64) -> Self {
            Self {
                ms: Arc::new(Mutex::new(secs.max(0) as u64 * 1000)),
            }
        }

        pub fn set_secs(&self, secs: i64) {
            *self.ms.lock() = secs.max(0) as u64 * 1000;
        }

        pub fn advance_secs(&self, secs: u64) {
            *self.ms.lock() += secs * 1000;
        }
    }

    impl Default for FakeClock {
        fn default() -> Self {
            Self::at_secs(1_700_000_000)
        }
    }

    impl Clock for FakeClock {
        fn epoch_ms(&self) -> u64 {
            *self.ms.lock()
        }
    }
}
