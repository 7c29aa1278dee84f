// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loopback TCP listener for status queries.
//!
//! The server never runs on its own: the event loop calls [`QueryServer::check`]
//! between log reads and while idle, and each call services at most one
//! connection. Queries therefore always see a state with no half-applied
//! event.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::{debug, info, trace, warn};
use tsd_storage::WorkflowState;

use tsd_daemon::protocol::{self, ProtocolError, DEFAULT_TIMEOUT};

/// Dynamic/private port range searched for a free port.
pub const PORT_RANGE: RangeInclusive<u16> = 49152..=65535;

/// How long [`QueryServer::drain`] waits for each further connection.
const DRAIN_WAIT: Duration = Duration::from_millis(10);

const BACKLOG: u32 = 5;

pub struct QueryServer {
    listener: TcpListener,
    addr: SocketAddr,
    discovery: PathBuf,
}

impl QueryServer {
    /// Bind the first free loopback port and publish it in `discovery`.
    pub fn bind(discovery: &Path) -> io::Result<Self> {
        Self::bind_in(PORT_RANGE, discovery)
    }

    pub fn bind_in(ports: RangeInclusive<u16>, discovery: &Path) -> io::Result<Self> {
        let mut last_error = None;
        for port in ports {
            match listen_on(port) {
                Ok(listener) => {
                    let addr = listener.local_addr()?;
                    std::fs::write(discovery, format!("{} {}\n", addr.ip(), addr.port()))?;
                    info!(%addr, discovery = %discovery.display(), "query server listening");
                    return Ok(Self {
                        listener,
                        addr,
                        discovery: discovery.to_path_buf(),
                    });
                }
                Err(e) => {
                    trace!(port, error = %e, "port unavailable");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, "empty port range")
        }))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        self.listener.accept().await
    }

    /// Service at most one connection, waiting up to `wait` for it.
    /// Returns whether a connection was serviced.
    pub async fn check(&self, state: &WorkflowState, wait: Duration) -> bool {
        match tokio::time::timeout(wait, self.accept()).await {
            Ok(Ok((stream, peer))) => {
                serve(stream, peer, state).await;
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "accept failed");
                false
            }
            Err(_) => false,
        }
    }

    /// Answer every connection that is already waiting.
    pub async fn drain(&self, state: &WorkflowState) -> usize {
        let mut served = 0;
        while self.check(state, DRAIN_WAIT).await {
            served += 1;
        }
        served
    }

    /// Stop listening and remove the discovery file.
    pub fn close(self) {
        drop(self.listener);
        match std::fs::remove_file(&self.discovery) {
            Ok(()) => debug!(discovery = %self.discovery.display(), "removed discovery file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(discovery = %self.discovery.display(), error = %e, "failed to remove discovery file"),
        }
    }
}

/// Answer one connection; errors are logged and dropped.
pub async fn serve(stream: TcpStream, peer: SocketAddr, state: &WorkflowState) {
    if let Err(e) = handle_connection(stream, peer, state).await {
        match e {
            ProtocolError::Timeout => warn!(%peer, "connection timeout"),
            ProtocolError::Io(e) => warn!(%peer, error = %e, "connection error"),
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    state: &WorkflowState,
) -> Result<(), ProtocolError> {
    let raw = protocol::read_request(&mut stream, DEFAULT_TIMEOUT).await?;
    if raw.is_empty() {
        debug!(%peer, "client closed without a request");
        return Ok(());
    }

    let request = protocol::parse_request(&raw);
    info!(%peer, request = ?request, "processing request");
    let response = protocol::respond(state, &request);
    protocol::write_response(&mut stream, &response, DEFAULT_TIMEOUT).await
}

fn listen_on(port: u16) -> io::Result<TcpListener> {
    let socket = TcpSocket::new_v4()?;
    socket.set_reuseaddr(true)?;
    socket.bind(SocketAddr::from((Ipv4Addr::LOCALHOST, port)))?;
    socket.listen(BACKLOG)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
