// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unix socket listener serving the `ouro` CLI's requests.
//!
//! CLI access is trusted local access gated by the socket file's
//! permissions, distinct from the owner-gated remote chat transport:
//! every request maps directly onto an engine operation rather than
//! going through `classify_contact`.
//!
//! Read-only requests (`Status`, `Ping`, `Hello`) answer from in-memory
//! state synchronously. Mutating requests (`Chat`, which covers
//! `/panic`, `/restart`, `/evolve`, and ad-hoc tasks) are appended to the
//! event bus and answered with an immediate "queued" acknowledgment —
//! the single engine loop remains the only event consumer, so the
//! listener never calls `Runtime::handle_event` itself.

use std::sync::Arc;
use std::time::Instant;

use ouro_core::{ChatId, Event};
use ouro_storage::MaterializedState;
use parking_lot::Mutex;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tracing::{error, warn};

use crate::event_bus::EventBus;
use crate::lifecycle::DaemonRuntime;
use crate::protocol::{self, Request, Response, StatusReport, DEFAULT_TIMEOUT, PROTOCOL_VERSION};

/// The local sentinel chat id CLI-originated commands register under
/// until a real owner contacts the bot over the remote chat transport.
pub const CLI_CHAT_ID: &str = "cli-local";

#[derive(Clone)]
pub struct ListenCtx {
    pub state: Arc<Mutex<MaterializedState>>,
    pub runtime: Arc<DaemonRuntime>,
    pub event_bus: EventBus,
    pub start_time: Instant,
    pub max_workers: usize,
    pub budget_limit_usd: f64,
    pub shutdown_notify: Arc<Notify>,
}

pub async fn run(listener: UnixListener, ctx: ListenCtx) {
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, ctx).await {
                        warn!("listener connection error: {e}");
                    }
                });
            }
            Err(e) => {
                error!("failed to accept connection: {e}");
            }
        }
    }
}

async fn handle_connection(
    mut stream: UnixStream,
    ctx: ListenCtx,
) -> Result<(), protocol::ProtocolError> {
    loop {
        let request = match protocol::read_request(&mut stream, DEFAULT_TIMEOUT).await {
            Ok(req) => req,
            Err(protocol::ProtocolError::ConnectionClosed) => return Ok(()),
            Err(e) => return Err(e),
        };

        let response = handle_request(request, &ctx).await;
        protocol::write_response(&mut stream, &response, DEFAULT_TIMEOUT).await?;
    }
}

async fn handle_request(request: Request, ctx: &ListenCtx) -> Response {
    match request {
        Request::Ping => Response::Pong,
        Request::Hello { version } => {
            if version != PROTOCOL_VERSION {
                warn!(client_version = %version, daemon_version = %PROTOCOL_VERSION, "protocol version mismatch");
            }
            Response::Hello {
                version: PROTOCOL_VERSION.to_string(),
            }
        }
        Request::Status => Response::Status(status_report(ctx)),
        Request::Chat { text } => match queue_chat_command(ctx, text) {
            Ok(()) => Response::ChatReply { text: None },
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },
        Request::Shutdown { kill } => {
            if kill {
                if let Err(e) = ctx.runtime.kill_all_workers().await {
                    return Response::Error {
                        message: e.to_string(),
                    };
                }
            }
            ctx.shutdown_notify.notify_waiters();
            Response::Ok
        }
    }
}

fn status_report(ctx: &ListenCtx) -> StatusReport {
    let state = ctx.state.lock();
    StatusReport {
        uptime_secs: ctx.start_time.elapsed().as_secs(),
        pending_tasks: state.pending.len(),
        running_tasks: state.running.len(),
        max_workers: ctx.max_workers,
        workers_active: state.workers.len(),
        spent_usd: state.spent_usd,
        budget_limit_usd: ctx.budget_limit_usd,
        budget_exhausted: state.budget_exhausted,
        evolution_mode_enabled: state.evolution_mode_enabled,
        consciousness_running: state.consciousness_running,
        owner_registered: state.owner.is_some(),
        current_branch: state.current_branch.clone(),
    }
}

fn queue_chat_command(ctx: &ListenCtx, text: String) -> Result<(), ouro_storage::WalError> {
    let chat_id = {
        let state = ctx.state.lock();
        state
            .owner
            .as_ref()
            .map(|o| o.owner_chat_id.clone())
            .unwrap_or_else(|| ChatId::new(CLI_CHAT_ID))
    };
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    ctx.event_bus.send(Event::ChatIn { chat_id, text, ts })?;
    Ok(())
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
