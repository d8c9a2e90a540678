// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ouroboros Daemon (ouroborosd)
//!
//! The supervisor process: owns the durable state, the worker pool, the
//! event dispatcher, the timeout enforcer, the safety gate, and the
//! restart coordinator. Listens on a Unix socket for the `ouro` CLI and
//! polls the chat transport for owner commands.
//!
//! Architecture:
//! - Listener task: socket I/O with the CLI, appends to the event bus.
//! - Chat poll task: long-polls the chat transport, appends `chat_in`
//!   events to the event bus. This auxiliary thread may do blocking
//!   I/O, but only to enqueue events for the main loop.
//! - Engine loop: the ~2Hz main loop that drains the event bus, runs one
//!   `Runtime::tick`, and answers shutdown signals.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod env;
mod event_bus;
mod lifecycle;
mod listener;
mod protocol;

use std::sync::Arc;
use std::time::Duration;

use ouro_core::Event;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::lifecycle::{Config, LifecycleError, StartupResult};
use crate::listener::ListenCtx;

/// Cadence of the supervisor's main loop: ~2Hz / 500ms.
const TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Chat transport long-poll timeout: short enough that the auxiliary
/// polling thread never blocks the main loop for long.
const CHAT_POLL_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!(
                    "ouroborosd {}",
                    concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH"))
                );
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!(
                    "ouroborosd {}",
                    concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH"))
                );
                println!("Ouroboros Daemon - supervisor process for the self-modifying agent");
                println!();
                println!("USAGE:");
                println!("    ouroborosd");
                println!();
                println!("The daemon is typically started by the `ouro` CLI and should not");
                println!("be invoked directly. It listens on a Unix socket for commands");
                println!("from `ouro`, and polls the configured chat transport for owner");
                println!("commands.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: ouroborosd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;
    rotate_log_if_needed(&config.log_path);
    write_startup_marker(&config)?;
    let log_guard = setup_logging(&config)?;

    info!("starting ouroboros supervisor");

    let StartupResult {
        mut daemon,
        listener: unix_listener,
        mut event_reader,
    } = match lifecycle::startup(&config).await {
        Ok(r) => r,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            let version = std::fs::read_to_string(&config.version_path)
                .unwrap_or_default()
                .trim()
                .to_string();

            eprintln!("ouroborosd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            if !version.is_empty() {
                let current_version =
                    concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH"));
                if version == current_version {
                    eprintln!("  version: {version}");
                } else {
                    eprintln!("  version: {version} (outdated — current: {current_version})");
                }
            }
            std::process::exit(1);
        }
        Err(e) => {
            write_startup_error(&config, &e);
            error!("failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let shutdown_notify = Arc::new(Notify::new());

    let ctx = ListenCtx {
        state: Arc::clone(&daemon.state),
        runtime: Arc::clone(&daemon.runtime),
        event_bus: daemon.event_bus.clone(),
        start_time: daemon.start_time,
        max_workers: daemon.config.max_workers,
        budget_limit_usd: daemon.config.budget_limit_usd,
        shutdown_notify: Arc::clone(&shutdown_notify),
    };
    tokio::spawn(listener::run(unix_listener, ctx));

    spawn_chat_poll_task(daemon.chat_transport.clone(), daemon.event_bus.clone());
    spawn_flush_task(daemon.event_bus.clone());

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(
        "daemon ready, listening on {}",
        config.socket_path.display()
    );
    println!("READY");

    let mut tick_interval = tokio::time::interval(tick_interval());

    loop {
        tokio::select! {
            result = event_reader.recv() => {
                match result {
                    Ok(Some(entry)) => {
                        let seq = entry.seq;
                        match entry.event {
                            Event::Shutdown => {
                                event_reader.mark_processed(seq);
                            }
                            event => match daemon.process_event(event).await {
                                Ok(()) => event_reader.mark_processed(seq),
                                Err(e) => {
                                    error!("error processing event (seq={}): {}", seq, e);
                                    event_reader.mark_processed(seq);
                                }
                            },
                        }
                    }
                    Ok(None) => {
                        info!("event bus closed, shutting down...");
                        break;
                    }
                    Err(e) => {
                        error!("error reading from WAL: {}", e);
                    }
                }
            }

            _ = shutdown_notify.notified() => {
                info!("shutdown requested via command");
                break;
            }

            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down...");
                break;
            }

            _ = sigint.recv() => {
                info!("received SIGINT, shutting down...");
                break;
            }

            _ = tick_interval.tick() => {
                if let Err(e) = daemon.runtime.tick().await {
                    error!("tick error: {}", e);
                }
            }
        }
    }

    daemon.shutdown()?;
    info!("daemon stopped");
    Ok(())
}

fn tick_interval() -> Duration {
    crate::env::timer_check_ms().unwrap_or(TICK_INTERVAL)
}

/// Spawn the auxiliary chat-poll task: long-polls the chat transport and
/// appends each update as a `chat_in` event. The main loop never touches
/// the transport directly, only the events this produces.
fn spawn_chat_poll_task(
    chat_transport: Arc<ouro_adapters::RemoteChatTransport>,
    event_bus: event_bus::EventBus,
) {
    tokio::spawn(async move {
        use ouro_adapters::ChatTransport;
        let mut offset: u64 = 0;
        loop {
            match chat_transport.fetch_updates(offset, CHAT_POLL_TIMEOUT).await {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        let ts = std::time::SystemTime::now()
                            .duration_since(std::time::UNIX_EPOCH)
                            .map(|d| d.as_millis() as u64)
                            .unwrap_or_default();
                        let event = Event::ChatIn {
                            chat_id: update.chat_id,
                            text: update.text,
                            ts,
                        };
                        if let Err(e) = event_bus.send(event) {
                            warn!("failed to enqueue chat_in event: {e}");
                        }
                    }
                }
                Err(e) => {
                    warn!("chat transport fetch_updates failed: {e}");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    });
}

/// Flush interval for group commit (~10ms durability window).
const FLUSH_INTERVAL: Duration = Duration::from_millis(10);

/// Spawn a task that periodically flushes the event bus.
fn spawn_flush_task(event_bus: event_bus::EventBus) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(FLUSH_INTERVAL);
        loop {
            interval.tick().await;
            if event_bus.needs_flush() {
                if let Err(e) = event_bus.flush() {
                    tracing::error!("failed to flush event bus: {}", e);
                }
            }
        }
    });
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep.
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`]. Best-effort:
/// rotation failures are silently ignored so the daemon still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };

    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

const STARTUP_MARKER_PREFIX: &str = "--- ouroborosd: starting (pid: ";

fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(
        file,
        "{}{}) ---\n",
        STARTUP_MARKER_PREFIX,
        std::process::id()
    )?;

    Ok(())
}

fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
