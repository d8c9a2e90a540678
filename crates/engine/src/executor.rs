// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effect executor: applies the pure [`Effect`] values the dispatcher
//! produces against the worker process, chat transport, and storage
//! adapters, keeping decision logic free of I/O.

use crate::scheduler::Scheduler;
use ouro_adapters::{ChatTransport, ChatTransportError, WorkerProcessAdapter, WorkerProcessError};
use ouro_core::{Clock, Effect, Event, Worker};
use ouro_storage::{MaterializedState, Snapshot, SnapshotError, Wal, WalError};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Grace period before a worker that ignored a shutdown/kill signal is
/// force-killed.
pub const T_GRACEFUL: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("worker process error: {0}")]
    WorkerProcess(#[from] WorkerProcessError),
    #[error("chat transport error: {0}")]
    ChatTransport(#[from] ChatTransportError),
    #[error("wal error: {0}")]
    Wal(#[from] WalError),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("re-exec failed: {0}")]
    ReExec(std::io::Error),
    #[error("background task panicked: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Applies [`Effect`]s produced by the dispatcher against the configured
/// adapters. Stateless beyond the shared state/WAL/scheduler handles, so
/// it can be cloned across tasks cheaply.
pub struct Executor<W, C, Ck> {
    worker_process: Arc<W>,
    chat_transport: Arc<C>,
    state: Arc<Mutex<MaterializedState>>,
    wal: Arc<Mutex<Wal>>,
    scheduler: Arc<Mutex<Scheduler>>,
    clock: Ck,
    event_tx: mpsc::Sender<Event>,
    snapshot_path: PathBuf,
}

impl<W, C, Ck> Executor<W, C, Ck>
where
    W: WorkerProcessAdapter,
    C: ChatTransport,
    Ck: Clock,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        worker_process: Arc<W>,
        chat_transport: Arc<C>,
        state: Arc<Mutex<MaterializedState>>,
        wal: Arc<Mutex<Wal>>,
        scheduler: Arc<Mutex<Scheduler>>,
        clock: Ck,
        event_tx: mpsc::Sender<Event>,
        snapshot_path: PathBuf,
    ) -> Self {
        Self {
            worker_process,
            chat_transport,
            state,
            wal,
            scheduler,
            clock,
            event_tx,
            snapshot_path,
        }
    }

    pub fn state(&self) -> Arc<Mutex<MaterializedState>> {
        Arc::clone(&self.state)
    }

    pub fn wal(&self) -> Arc<Mutex<Wal>> {
        Arc::clone(&self.wal)
    }

    pub fn scheduler(&self) -> Arc<Mutex<Scheduler>> {
        Arc::clone(&self.scheduler)
    }

    pub fn event_tx(&self) -> mpsc::Sender<Event> {
        self.event_tx.clone()
    }

    /// Apply a single effect, tracing start/elapsed/result the way the
    /// rest of the supervisor's I/O boundary does.
    pub async fn execute(&self, effect: Effect) -> Result<(), ExecuteError> {
        let op_name = effect.name();
        let span = tracing::info_span!("effect", effect = op_name);
        let _guard = span.enter();

        let start = std::time::Instant::now();
        let result = self.execute_inner(effect).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(()) => tracing::debug!(elapsed_ms, "effect applied"),
            Err(e) => tracing::error!(elapsed_ms, error = %e, "effect failed"),
        }

        result
    }

    /// Apply a batch of effects in order, stopping at the first error.
    pub async fn execute_all(&self, effects: Vec<Effect>) -> Result<(), ExecuteError> {
        for effect in effects {
            self.execute(effect).await?;
        }
        Ok(())
    }

    async fn execute_inner(&self, effect: Effect) -> Result<(), ExecuteError> {
        match effect {
            Effect::Emit { event } => {
                self.state.lock().apply_event(&event);
                self.wal.lock().append(&event)?;
                Ok(())
            }

            Effect::SpawnWorker { id } => {
                self.worker_process.spawn(&id, self.event_tx.clone()).await?;
                let now = self.clock.epoch_ms();
                self.state
                    .lock()
                    .workers
                    .insert(id.clone(), Worker::new(id, now));
                Ok(())
            }

            Effect::KillWorker { id } => {
                self.worker_process.kill(&id, T_GRACEFUL).await?;
                self.state.lock().workers.remove(&id);
                Ok(())
            }

            Effect::EnqueueTask { task } => {
                self.state.lock().enqueue_pending(task);
                Ok(())
            }

            Effect::DispatchTask { worker, task } => {
                self.worker_process.dispatch_task(&worker, &task).await?;
                if let Some(w) = self.state.lock().workers.get_mut(&worker) {
                    w.current_task_id = Some(task.id.clone());
                }
                Ok(())
            }

            Effect::CancelTask { worker, task_id } => {
                self.worker_process.cancel_task(&worker, &task_id).await?;
                Ok(())
            }

            Effect::ShutdownWorker { worker } => {
                self.worker_process.kill(&worker, T_GRACEFUL).await?;
                Ok(())
            }

            Effect::SendToolDecision {
                worker,
                allow,
                reason,
            } => {
                self.worker_process
                    .send_tool_decision(&worker, allow, reason.as_deref())
                    .await?;
                Ok(())
            }

            Effect::SetTimer { id, duration } => {
                let now = self.clock.now();
                self.scheduler.lock().set_timer(id, duration, now);
                Ok(())
            }

            Effect::CancelTimer { id } => {
                self.scheduler.lock().cancel_timer(&id);
                Ok(())
            }

            Effect::SendChatMessage {
                chat_id,
                text,
                markdown,
            } => {
                self.chat_transport
                    .send_message(&chat_id, &text, markdown)
                    .await?;
                Ok(())
            }

            Effect::PersistQueueSnapshot { reason } => {
                tracing::debug!(reason, "persisting queue snapshot");
                let seq = self.wal.lock().processed_seq();
                let state = self.state.lock().clone();
                let path = self.snapshot_path.clone();
                tokio::task::spawn_blocking(move || Snapshot::new(seq, state).save(&path))
                    .await??;
                Ok(())
            }

            Effect::ReExec => self.re_exec(),

            Effect::ExitProcess { code } => self.exit_process(code),
        }
    }

    /// `/panic`'s final effect: the workers are already killed and the
    /// owner already notified by the effects ahead of this one in the
    /// same batch, so this is a plain hard stop.
    fn exit_process(&self, code: i32) -> Result<(), ExecuteError> {
        tracing::warn!(code, "exiting process on panic command");
        std::process::exit(code);
    }

    /// Re-exec the supervisor binary with its original arguments, the
    /// final step of a safe restart. Spawns a replacement
    /// process and exits this one; `unsafe_code = "forbid"` rules out a
    /// true POSIX `execve` handoff.
    fn re_exec(&self) -> Result<(), ExecuteError> {
        let exe = std::env::current_exe().map_err(ExecuteError::ReExec)?;
        let args: Vec<String> = std::env::args().skip(1).collect();
        tracing::warn!(exe = %exe.display(), "re-executing supervisor binary");
        std::process::Command::new(exe)
            .args(args)
            .spawn()
            .map_err(ExecuteError::ReExec)?;
        std::process::exit(0);
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
