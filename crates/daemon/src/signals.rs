// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unix signals observed by the event loop.

use std::io;

use tokio::signal::unix::{signal, Signal, SignalKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    /// SIGINT or SIGTERM
    Shutdown(&'static str),
    /// SIGUSR1
    Louder,
    /// SIGUSR2
    Quieter,
    /// SIGHUP, which the daemon ignores
    Hangup,
}

pub struct Signals {
    interrupt: Signal,
    terminate: Signal,
    hangup: Signal,
    user1: Signal,
    user2: Signal,
}

impl Signals {
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            hangup: signal(SignalKind::hangup())?,
            user1: signal(SignalKind::user_defined1())?,
            user2: signal(SignalKind::user_defined2())?,
        })
    }

    pub async fn recv(&mut self) -> SignalEvent {
        tokio::select! {
            _ = self.interrupt.recv() => SignalEvent::Shutdown("SIGINT"),
            _ = self.terminate.recv() => SignalEvent::Shutdown("SIGTERM"),
            _ = self.hangup.recv() => SignalEvent::Hangup,
            _ = self.user1.recv() => SignalEvent::Louder,
            _ = self.user2.recv() => SignalEvent::Quieter,
        }
    }
}
