// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol between the `ouro` CLI and the `ouroborosd` daemon.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload. The CLI
//! is trusted local access (gated by Unix socket file permissions), unlike
//! the owner-gated remote chat transport, so every CLI request maps
//! directly onto an engine operation rather than going through contact
//! classification.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Requests the CLI can send to the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Liveness check; always answered with `Response::Pong`.
    Ping,
    /// Handshake performed once after connecting, before any other request.
    Hello { version: String },
    /// Snapshot of the supervisor's current state (`ouro status`).
    Status,
    /// A chat-style command, reusing the same router the remote owner chat
    /// uses: `/panic`, `/restart`, `/evolve [on|off]`, or free-form text
    /// for an ad-hoc task.
    Chat { text: String },
    /// Request the daemon to stop. `kill` additionally cancels every
    /// active task before the process exits; without it, tasks keep
    /// running until the daemon is restarted and reconciles state.
    Shutdown { kill: bool },
}

/// A point-in-time view of the supervisor, returned by `Request::Status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub uptime_secs: u64,
    pub pending_tasks: usize,
    pub running_tasks: usize,
    pub max_workers: usize,
    pub workers_active: usize,
    pub spent_usd: f64,
    pub budget_limit_usd: f64,
    pub budget_exhausted: bool,
    pub evolution_mode_enabled: bool,
    pub consciousness_running: bool,
    pub owner_registered: bool,
    pub current_branch: Option<String>,
}

/// Responses the daemon can send back to the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Ok,
    Pong,
    Hello { version: String },
    Error { message: String },
    Status(StatusReport),
    /// Reply text produced by the chat router, if the command had one
    /// (ad-hoc tasks are acknowledged with no immediate reply).
    ChatReply { text: Option<String> },
}

/// Protocol errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
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

/// Maximum message size (200 MB).
pub const MAX_MESSAGE_SIZE: usize = 200 * 1024 * 1024;

/// Default IPC timeout.
pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Protocol version, derived from the crate version plus the build's git
/// hash so a CLI talking to a stale daemon gets a clear version mismatch
/// rather than a confusing deserialize failure.
pub const PROTOCOL_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH"));

/// Encode a message to JSON bytes (without length prefix).
///
/// Use with [`write_message`], which handles the length-prefix wire format.
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, ProtocolError> {
    let json = serde_json::to_vec(msg)?;
    if json.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: json.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(json)
}

/// Decode a message from wire format.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Read a length-prefixed message from an async reader.
pub async fn read_message<R: tokio::io::AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed);
        }
        Err(e) => return Err(ProtocolError::Io(e)),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Write a length-prefixed message to an async writer.
pub async fn write_message<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    let len = data.len();
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }
    writer.write_all(&(len as u32).to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a request with a timeout.
pub async fn read_request<R: tokio::io::AsyncReadExt + Unpin>(
    reader: &mut R,
    timeout: std::time::Duration,
) -> Result<Request, ProtocolError> {
    let bytes = tokio::time::timeout(timeout, read_message(reader))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    decode(&bytes)
}

/// Write a response with a timeout.
pub async fn write_response<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    response: &Response,
    timeout: std::time::Duration,
) -> Result<(), ProtocolError> {
    let data = encode(response)?;
    tokio::time::timeout(timeout, write_message(writer, &data))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
