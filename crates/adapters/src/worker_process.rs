// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker process adapter: spawns the OS child processes that drive one
//! LLM-reasoning loop each, and speaks the length-prefixed JSON task/event
//! protocol over their stdin/stdout pipes.

use async_trait::async_trait;
use ouro_core::{Event, Task, TaskId, WorkerId};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::process::{Child, ChildStdin};
use tokio::sync::{mpsc, Mutex};

use crate::wire;

#[derive(Debug, Error)]
pub enum WorkerProcessError {
    #[error("worker {0} is not running")]
    NotRunning(WorkerId),
    #[error("spawn failed: {0}")]
    Spawn(std::io::Error),
    #[error("worker {0} did not expose a piped {1}")]
    MissingPipe(WorkerId, &'static str),
    #[error("io error writing to worker {worker}: {source}")]
    Write {
        worker: WorkerId,
        source: std::io::Error,
    },
    #[error("wire error: {0}")]
    Wire(#[from] wire::WireError),
}

/// Message sent to a worker over its task pipe, per the supervisor's
/// signaling protocol.
#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum SupervisorMessage<'a> {
    Run { task: &'a Task },
    Cancel,
    Shutdown,
    /// Reply to a `tool_call_proposed` event, the one synchronous
    /// round-trip in the wire protocol.
    ToolDecision {
        allow: bool,
        reason: Option<&'a str>,
    },
}

/// Adapter the pool (in `ouro-engine`) uses to manage worker OS processes,
/// kept free of pool/scheduling decisions so it can be faked in tests.
#[async_trait]
pub trait WorkerProcessAdapter: Send + Sync + 'static {
    /// Launch a new worker process for `id`, wiring its event pipe to
    /// `event_tx`. Each line the child writes to stdout is parsed as an
    /// [`Event`] and forwarded; malformed lines are logged and dropped.
    async fn spawn(
        &self,
        id: &WorkerId,
        event_tx: mpsc::Sender<Event>,
    ) -> Result<(), WorkerProcessError>;

    /// Send `{op:"run", task:{...}}` on the worker's task pipe.
    async fn dispatch_task(&self, id: &WorkerId, task: &Task) -> Result<(), WorkerProcessError>;

    /// Send `{op:"cancel"}` on the worker's task pipe.
    async fn cancel_task(&self, id: &WorkerId, task_id: &TaskId)
        -> Result<(), WorkerProcessError>;

    /// Graceful termination: send `{op:"shutdown"}`, wait up to `grace`,
    /// then force-kill if the process hasn't exited.
    async fn kill(&self, id: &WorkerId, grace: Duration) -> Result<(), WorkerProcessError>;

    /// Whether the worker process is still alive.
    async fn is_alive(&self, id: &WorkerId) -> bool;

    /// Reply to a worker's `tool_call_proposed` event with the Safety
    /// Gate's decision, the one synchronous round-trip in the protocol.
    async fn send_tool_decision(
        &self,
        id: &WorkerId,
        allow: bool,
        reason: Option<&str>,
    ) -> Result<(), WorkerProcessError>;
}

struct RunningWorker {
    child: Child,
    stdin: BufWriter<ChildStdin>,
}

/// Production adapter: spawns `binary` once per worker, passing the
/// worker id as argv[1].
pub struct SubprocessWorkerAdapter {
    binary: PathBuf,
    workers: Mutex<HashMap<WorkerId, RunningWorker>>,
}

impl SubprocessWorkerAdapter {
    pub fn new(binary: PathBuf) -> Self {
        Self {
            binary,
            workers: Mutex::new(HashMap::new()),
        }
    }

    async fn send(&self, id: &WorkerId, msg: &SupervisorMessage<'_>) -> Result<(), WorkerProcessError> {
        let mut workers = self.workers.lock().await;
        let worker = workers
            .get_mut(id)
            .ok_or_else(|| WorkerProcessError::NotRunning(id.clone()))?;
        wire::write_frame(&mut worker.stdin, msg)
            .await
            .map_err(WorkerProcessError::from)
    }
}

#[async_trait]
impl WorkerProcessAdapter for SubprocessWorkerAdapter {
    async fn spawn(
        &self,
        id: &WorkerId,
        event_tx: mpsc::Sender<Event>,
    ) -> Result<(), WorkerProcessError> {
        let mut command = tokio::process::Command::new(&self.binary);
        command
            .arg(id.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(WorkerProcessError::Spawn)?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| WorkerProcessError::MissingPipe(id.clone(), "stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| WorkerProcessError::MissingPipe(id.clone(), "stdout"))?;

        let worker_id = id.clone();
        tokio::spawn(async move {
            let mut reader = tokio::io::BufReader::new(stdout);
            loop {
                match wire::read_frame::<Event, _>(&mut reader).await {
                    Ok(event) => {
                        if event_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(wire::WireError::ConnectionClosed) => break,
                    Err(e) => {
                        tracing::warn!(worker = %worker_id, error = %e, "dropping malformed worker event");
                        break;
                    }
                }
            }
        });

        self.workers.lock().await.insert(
            id.clone(),
            RunningWorker {
                child,
                stdin: BufWriter::new(stdin),
            },
        );
        Ok(())
    }

    async fn dispatch_task(&self, id: &WorkerId, task: &Task) -> Result<(), WorkerProcessError> {
        self.send(id, &SupervisorMessage::Run { task }).await
    }

    async fn cancel_task(
        &self,
        id: &WorkerId,
        _task_id: &TaskId,
    ) -> Result<(), WorkerProcessError> {
        self.send(id, &SupervisorMessage::Cancel).await
    }

    async fn kill(&self, id: &WorkerId, grace: Duration) -> Result<(), WorkerProcessError> {
        let _ = self.send(id, &SupervisorMessage::Shutdown).await;

        let mut workers = self.workers.lock().await;
        let Some(worker) = workers.get_mut(id) else {
            return Ok(());
        };

        let exited = tokio::time::timeout(grace, worker.child.wait()).await;
        if exited.is_err() {
            let _ = worker.child.kill().await;
            let _ = worker.child.wait().await;
        }
        workers.remove(id);
        Ok(())
    }

    async fn is_alive(&self, id: &WorkerId) -> bool {
        let mut workers = self.workers.lock().await;
        match workers.get_mut(id) {
            Some(worker) => matches!(worker.child.try_wait(), Ok(None)),
            None => false,
        }
    }

    async fn send_tool_decision(
        &self,
        id: &WorkerId,
        allow: bool,
        reason: Option<&str>,
    ) -> Result<(), WorkerProcessError> {
        self.send(id, &SupervisorMessage::ToolDecision { allow, reason })
            .await
    }
}

/// In-memory fake for unit and integration tests: no real process is
/// spawned; calls are recorded and events can be injected by the test.
#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex as SyncMutex;

    #[derive(Debug, Clone, PartialEq)]
    pub enum WorkerCall {
        Spawn(WorkerId),
        Dispatch(WorkerId, TaskId),
        Cancel(WorkerId, TaskId),
        Kill(WorkerId),
        ToolDecision(WorkerId, bool),
    }

    #[derive(Default)]
    pub struct FakeWorkerProcessAdapter {
        pub calls: SyncMutex<Vec<WorkerCall>>,
        pub alive: SyncMutex<std::collections::HashSet<WorkerId>>,
    }

    impl FakeWorkerProcessAdapter {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl WorkerProcessAdapter for FakeWorkerProcessAdapter {
        async fn spawn(
            &self,
            id: &WorkerId,
            _event_tx: mpsc::Sender<Event>,
        ) -> Result<(), WorkerProcessError> {
            self.calls.lock().push(WorkerCall::Spawn(id.clone()));
            self.alive.lock().insert(id.clone());
            Ok(())
        }

        async fn dispatch_task(
            &self,
            id: &WorkerId,
            task: &Task,
        ) -> Result<(), WorkerProcessError> {
            self.calls
                .lock()
                .push(WorkerCall::Dispatch(id.clone(), task.id.clone()));
            Ok(())
        }

        async fn cancel_task(
            &self,
            id: &WorkerId,
            task_id: &TaskId,
        ) -> Result<(), WorkerProcessError> {
            self.calls
                .lock()
                .push(WorkerCall::Cancel(id.clone(), task_id.clone()));
            Ok(())
        }

        async fn kill(&self, id: &WorkerId, _grace: Duration) -> Result<(), WorkerProcessError> {
            self.calls.lock().push(WorkerCall::Kill(id.clone()));
            self.alive.lock().remove(id);
            Ok(())
        }

        async fn is_alive(&self, id: &WorkerId) -> bool {
            self.alive.lock().contains(id)
        }

        async fn send_tool_decision(
            &self,
            id: &WorkerId,
            allow: bool,
            _reason: Option<&str>,
        ) -> Result<(), WorkerProcessError> {
            self.calls
                .lock()
                .push(WorkerCall::ToolDecision(id.clone(), allow));
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeWorkerProcessAdapter, WorkerCall};
