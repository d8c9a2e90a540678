// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared length-prefixed JSON framing.
//!
//! Both the supervisor-worker task/event pipes and the
//! daemon-CLI IPC socket speak the same wire format: a 4-byte
//! big-endian length prefix followed by a JSON payload. This module is the
//! one place that encodes/decodes it.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Maximum message size (16 MB). Generous for task payloads and status
/// reports, small enough to bound a misbehaving peer.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },
    #[error("connection closed")]
    ConnectionClosed,
    #[error("timeout")]
    Timeout,
}

/// Read one length-prefixed frame and decode it as `T`.
pub async fn read_frame<T, R>(reader: &mut R) -> Result<T, WireError>
where
    T: DeserializeOwned,
    R: AsyncReadExt + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(WireError::ConnectionClosed);
        }
        Err(e) => return Err(WireError::Io(e)),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(WireError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(serde_json::from_slice(&buf)?)
}

/// Encode `msg` and write it as one length-prefixed frame.
pub async fn write_frame<T, W>(writer: &mut W, msg: &T) -> Result<(), WireError>
where
    T: Serialize,
    W: AsyncWriteExt + Unpin,
{
    let data = serde_json::to_vec(msg)?;
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(WireError::MessageTooLarge {
            size: data.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    writer.write_all(&(data.len() as u32).to_be_bytes()).await?;
    writer.write_all(&data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a frame with a timeout, for callers that must not block past a
/// bounded window — the main loop must not block more than ~100ms on any
/// single operation; IPC reads use their own short timeout.
pub async fn read_frame_timeout<T, R>(
    reader: &mut R,
    timeout: std::time::Duration,
) -> Result<T, WireError>
where
    T: DeserializeOwned,
    R: AsyncReadExt + Unpin,
{
    tokio::time::timeout(timeout, read_frame(reader))
        .await
        .map_err(|_| WireError::Timeout)?
}
