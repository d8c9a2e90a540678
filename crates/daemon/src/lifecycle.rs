// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration, startup, and shutdown.
//!
//! The lock file is acquired before anything else touches the state
//! directory, the snapshot is loaded and the WAL replayed to rebuild
//! [`MaterializedState`], breadcrumbs are scanned for tasks a crash left
//! running, and only then is the Unix socket bound.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ouro_adapters::{
    LlmSafetyClassifier, RemoteChatTransport, SafetyClassifier, SubprocessWorkerAdapter,
};
use ouro_core::{Event, SystemClock, TaskStatus};
use ouro_engine::breadcrumb::{self, Breadcrumb, BreadcrumbWriter};
use ouro_engine::{RestartCoordinator, Runtime, RuntimeConfig, RuntimeDeps};
use ouro_storage::{load_snapshot, Checkpointer, MaterializedState, Wal};
use parking_lot::Mutex;
use serde::Deserialize;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::event_bus::{EventBus, EventReader};

/// The concrete adapter set the daemon wires up in production: a real
/// worker subprocess, the remote messenger chat gateway (the primary
/// deployment surface — a local GUI transport is a separate, unbuilt
/// surface, see DESIGN.md), and the system clock.
pub type DaemonRuntime = Runtime<SubprocessWorkerAdapter, RemoteChatTransport, SystemClock>;

/// On-disk config file, every field optional so a missing or partial
/// `config.toml` still boots with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    max_workers: Option<usize>,
    total_budget_usd: Option<f64>,
    soft_timeout_secs: Option<u64>,
    hard_timeout_secs: Option<u64>,
    worker_binary: Option<String>,
    chat_base_url: Option<String>,
    safety_fast_endpoint: Option<String>,
    safety_deep_endpoint: Option<String>,
    safety_policy_path: Option<String>,
    repo_path: Option<String>,
}

/// Fully resolved daemon configuration: fixed on-disk layout plus the
/// tunables loaded from `config.toml`.
#[derive(Debug, Clone)]
pub struct Config {
    pub state_dir: PathBuf,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub version_path: PathBuf,
    pub log_path: PathBuf,
    pub wal_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub logs_dir: PathBuf,
    pub chat_log_path: PathBuf,
    pub memory_dir: PathBuf,
    pub repo_path: PathBuf,
    pub restart_lock_path: PathBuf,

    pub max_workers: usize,
    pub budget_limit_usd: f64,
    pub soft_timeout: Duration,
    pub hard_timeout: Duration,
    pub worker_binary: PathBuf,
    pub chat_base_url: String,
    pub safety_fast_endpoint: String,
    pub safety_deep_endpoint: String,
    pub safety_policy: String,
}

impl Config {
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = state_dir()?;
        let config_path = state_dir.join("config.toml");
        let file: ConfigFile = match std::fs::read_to_string(&config_path) {
            Ok(contents) => toml::from_str(&contents).map_err(LifecycleError::Config)?,
            Err(_) => ConfigFile::default(),
        };

        let repo_path = file
            .repo_path
            .map(PathBuf::from)
            .unwrap_or_else(|| state_dir.join("repo"));
        let safety_policy = file
            .safety_policy_path
            .map(PathBuf::from)
            .or_else(|| Some(state_dir.join("safety_policy.md")))
            .and_then(|p| std::fs::read_to_string(p).ok())
            .unwrap_or_default();

        Ok(Self {
            socket_path: state_dir.join("daemon.sock"),
            lock_path: state_dir.join("daemon.pid"),
            version_path: state_dir.join("daemon.version"),
            log_path: state_dir.join("daemon.log"),
            wal_path: state_dir.join("events.wal"),
            snapshot_path: state_dir.join("queue_snapshot.json"),
            logs_dir: state_dir.join("logs"),
            chat_log_path: state_dir.join("chat.jsonl"),
            memory_dir: state_dir.join("memory"),
            restart_lock_path: state_dir.join("restart.lock"),
            repo_path,
            max_workers: file.max_workers.unwrap_or(3).clamp(1, 10),
            budget_limit_usd: file.total_budget_usd.unwrap_or(10.0),
            soft_timeout: Duration::from_secs(file.soft_timeout_secs.unwrap_or(15 * 60)),
            hard_timeout: Duration::from_secs(file.hard_timeout_secs.unwrap_or(30 * 60)),
            worker_binary: file
                .worker_binary
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("ouro-worker")),
            chat_base_url: file
                .chat_base_url
                .unwrap_or_else(|| "http://localhost:8080".to_string()),
            safety_fast_endpoint: file
                .safety_fast_endpoint
                .unwrap_or_else(|| "http://localhost:11434/fast".to_string()),
            safety_deep_endpoint: file
                .safety_deep_endpoint
                .unwrap_or_else(|| "http://localhost:11434/deep".to_string()),
            safety_policy,
            state_dir,
        })
    }
}

fn state_dir() -> Result<PathBuf, LifecycleError> {
    crate::env::state_dir()
}

/// Lifecycle errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("invalid config.toml: {0}")]
    Config(#[from] toml::de::Error),

    #[error("WAL error: {0}")]
    Wal(#[from] ouro_storage::WalError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] ouro_storage::SnapshotError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Everything the daemon process holds for its lifetime.
pub struct DaemonState {
    pub config: Config,
    // Held for the process lifetime to maintain the exclusive lock;
    // released automatically on drop.
    lock_file: File,
    pub state: Arc<Mutex<MaterializedState>>,
    pub runtime: Arc<DaemonRuntime>,
    pub restart_coordinator: RestartCoordinator,
    pub event_bus: EventBus,
    pub breadcrumbs: BreadcrumbWriter,
    pub start_time: Instant,
    pub chat_transport: Arc<RemoteChatTransport>,
}

impl DaemonState {
    /// Apply an event to in-memory state, then hand it to the runtime's
    /// dispatcher for any resulting effects.
    ///
    /// Applying `event` to `state` here and again via WAL replay at the
    /// next startup is deliberate: `MaterializedState::apply_event` is
    /// idempotent, so double-application is harmless, and this keeps
    /// in-memory state visible to the listener immediately rather than
    /// waiting on the next engine loop iteration.
    pub async fn process_event(&mut self, event: Event) -> Result<(), LifecycleError> {
        self.state.lock().apply_event(&event);
        self.track_breadcrumb(&event);

        let restart_requested = self
            .runtime
            .handle_event(event)
            .await
            .map_err(|e| LifecycleError::Runtime(e.to_string()))?;

        if restart_requested {
            let outcome = self
                .runtime
                .safe_restart(
                    "owner requested restart",
                    ouro_engine::UnsyncedPolicy::RescueAndReset,
                    &self.restart_coordinator,
                )
                .await;
            if let Err(e) = outcome {
                warn!("safe restart failed: {e}");
            }
        }

        Ok(())
    }

    fn track_breadcrumb(&self, event: &Event) {
        let state = self.state.lock();
        match event {
            Event::TaskStarted { task_id, .. } | Event::TaskProgress { task_id, .. } => {
                if let Some(task) = state.running.get(task_id) {
                    self.breadcrumbs.write(task);
                }
            }
            Event::TaskDone { task_id, .. } | Event::TaskFailed { task_id, .. } => {
                self.breadcrumbs.delete(task_id);
            }
            _ => {}
        }
    }

    /// Shut the daemon down gracefully: flush and checkpoint the WAL so
    /// the next startup replays nothing, then remove the lock/socket/
    /// version files the running instance owns.
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("shutting down daemon");

        if let Err(e) = self.event_bus.flush() {
            warn!("failed to flush WAL on shutdown: {e}");
        }

        let processed_seq = self.event_bus.processed_seq();
        if processed_seq > 0 {
            let state_clone = self.state.lock().clone();
            let checkpointer = Checkpointer::new(self.config.snapshot_path.clone());
            match checkpointer.checkpoint_sync(processed_seq, &state_clone) {
                Ok(result) => info!(seq = result.seq, "saved final shutdown snapshot"),
                Err(e) => warn!("failed to save shutdown snapshot: {e}"),
            }
        }

        if self.config.socket_path.exists() {
            let _ = std::fs::remove_file(&self.config.socket_path);
        }
        if self.config.lock_path.exists() {
            let _ = std::fs::remove_file(&self.config.lock_path);
        }
        if self.config.version_path.exists() {
            let _ = std::fs::remove_file(&self.config.version_path);
        }

        info!("daemon shutdown complete");
        Ok(())
    }
}

/// Bundle returned by [`startup`]: the live daemon state, the bound
/// listener, and the reader the main loop polls for WAL entries.
pub struct StartupResult {
    pub daemon: DaemonState,
    pub listener: UnixListener,
    pub event_reader: EventReader,
}

pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config).await {
        Ok(result) => Ok(result),
        Err(e) => {
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<StartupResult, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;
    std::fs::create_dir_all(&config.logs_dir)?;
    std::fs::create_dir_all(&config.memory_dir)?;

    // Acquire the lock before truncating it, so a losing racer never wipes
    // the winning daemon's PID.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    use fs2::FileExt;
    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    std::fs::write(
        &config.version_path,
        concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH")),
    )?;

    let (mut state, processed_seq) = match load_snapshot(&config.snapshot_path)? {
        Some(snapshot) => {
            info!(
                seq = snapshot.seq,
                pending = snapshot.state.pending.len(),
                running = snapshot.state.running.len(),
                "loaded snapshot"
            );
            (snapshot.state, snapshot.seq)
        }
        None => {
            info!("no snapshot found, starting with empty state");
            (MaterializedState::default(), 0)
        }
    };

    let event_wal = Wal::open(&config.wal_path, processed_seq)?;
    let events_to_replay = event_wal.entries_after(processed_seq)?;
    let (event_bus, event_reader) = EventBus::new(event_wal);
    let replay_count = events_to_replay.len();
    for entry in events_to_replay {
        state.apply_event(&entry.event);
    }
    if replay_count > 0 {
        info!(replay_count, "replayed events from WAL");
    }

    // Every task the snapshot still lists as running belongs to a worker
    // process that died with the daemon; requeue it (respecting the
    // retry cap) rather than leaving it stuck.
    let breadcrumbs_dir = config.logs_dir.clone();
    let scanned = breadcrumb::scan(&breadcrumbs_dir);
    let orphans = breadcrumb::orphans_not_in_running_set(&scanned, &state.running);
    if !orphans.is_empty() {
        warn!(count = orphans.len(), "orphaned breadcrumbs with no matching running task");
    }
    let running_ids: Vec<_> = state.running.keys().cloned().collect();
    for task_id in running_ids {
        if let Some(mut task) = state.running.remove(&task_id) {
            if task.can_retry() {
                task.requeue_after_loss();
                state.pending.push(task);
            } else {
                task.status = TaskStatus::Failed;
                task.result_summary = Some("worker lost across daemon restart".to_string());
                state.task_log.push(task);
            }
        }
    }
    state
        .pending
        .sort_by_key(|t| (t.order_key().0, t.order_key().1));

    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    let state = Arc::new(Mutex::new(state));
    let wal = event_reader.wal();
    let scheduler = Arc::new(Mutex::new(ouro_engine::Scheduler::new()));
    let (internal_tx, internal_rx) = mpsc::channel::<Event>(100);
    spawn_runtime_event_forwarder(internal_rx, event_bus.clone());

    let worker_process = Arc::new(SubprocessWorkerAdapter::new(config.worker_binary.clone()));
    let chat_transport = Arc::new(RemoteChatTransport::new(config.chat_base_url.clone()));
    let executor = ouro_engine::Executor::new(
        worker_process,
        Arc::clone(&chat_transport),
        Arc::clone(&state),
        wal,
        Arc::clone(&scheduler),
        SystemClock,
        internal_tx,
        config.snapshot_path.clone(),
    );

    let classifier: Arc<dyn SafetyClassifier> = Arc::new(LlmSafetyClassifier::new(
        config.safety_fast_endpoint.clone(),
        config.safety_deep_endpoint.clone(),
    ));
    let safety_gate = Arc::new(ouro_engine::SafetyGate::new(
        classifier,
        config.safety_policy.clone(),
    ));

    let runtime = Arc::new(Runtime::new(RuntimeDeps {
        executor,
        scheduler,
        safety_gate,
        config: RuntimeConfig {
            max_workers: config.max_workers,
            budget_limit_usd: config.budget_limit_usd,
            soft_timeout_grace: ouro_engine::RuntimeConfig::default().soft_timeout_grace,
            stale_after: ouro_engine::RuntimeConfig::default().stale_after,
            evolution_interval: ouro_engine::RuntimeConfig::default().evolution_interval,
            budget_report_every: ouro_engine::RuntimeConfig::default().budget_report_every,
            safety_policy: config.safety_policy.clone(),
        },
        clock: SystemClock,
    }));

    let restart_coordinator =
        RestartCoordinator::new(config.restart_lock_path.clone(), config.repo_path.clone());
    let breadcrumbs = BreadcrumbWriter::new(config.logs_dir.clone());

    info!("daemon started");

    Ok(StartupResult {
        daemon: DaemonState {
            config: config.clone(),
            lock_file,
            state,
            runtime,
            restart_coordinator,
            event_bus,
            breadcrumbs,
            start_time: Instant::now(),
            chat_transport,
        },
        listener,
        event_reader,
    })
}

/// Forward runtime-internal events (produced inside `Executor::execute`,
/// e.g. synthetic follow-up events) to the WAL, flushing after each
/// drained batch so crash recovery doesn't depend on the 10ms group-
/// commit window for these.
fn spawn_runtime_event_forwarder(mut rx: mpsc::Receiver<Event>, event_bus: EventBus) {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if event_bus.send(event).is_err() {
                warn!("failed to forward runtime event to WAL");
                continue;
            }
            while let Ok(event) = rx.try_recv() {
                if event_bus.send(event).is_err() {
                    warn!("failed to forward runtime event to WAL");
                }
            }
            if let Err(e) = event_bus.flush() {
                tracing::error!("failed to flush runtime events: {e}");
            }
        }
    });
}

fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.version_path.exists() {
        let _ = std::fs::remove_file(&config.version_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
