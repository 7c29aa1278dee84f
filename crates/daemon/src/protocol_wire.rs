// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket reads and writes for the query protocol.

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout")]
    Timeout,
}

/// Requests longer than this are truncated. One read, one line.
pub const MAX_REQUEST_SIZE: usize = 1024;

/// Per-connection read/write timeout
pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Read at most [`MAX_REQUEST_SIZE`] bytes with one read call.
///
/// An empty result means the client closed without sending anything.
pub async fn read_request<R: AsyncReadExt + Unpin>(
    reader: &mut R,
    timeout: std::time::Duration,
) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = vec![0u8; MAX_REQUEST_SIZE];
    let n = tokio::time::timeout(timeout, reader.read(&mut buf))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    buf.truncate(n);
    Ok(buf)
}

/// Write the whole response and shut down the write half.
pub async fn write_response<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    response: &str,
    timeout: std::time::Duration,
) -> Result<(), ProtocolError> {
    tokio::time::timeout(timeout, async {
        writer.write_all(response.as_bytes()).await?;
        writer.flush().await?;
        writer.shutdown().await
    })
    .await
    .map_err(|_| ProtocolError::Timeout)??;
    Ok(())
}
