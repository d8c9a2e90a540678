// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects: pure data describing a side effect the dispatcher wants
//! performed. A central executor applies these against pluggable adapters,
//! keeping decision logic (in `ouro-engine`) free of I/O.

use crate::event::Event;
use crate::owner::ChatId;
use crate::task::{Task, TaskId};
use crate::worker::WorkerId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Effect {
    /// Apply `event` to in-memory state immediately and append it to the
    /// write-ahead log; this is how every other effect's bookkeeping
    /// becomes durable.
    Emit { event: Event },
    /// Spawn a new worker process and assign it `id`.
    SpawnWorker { id: WorkerId },
    /// Terminate a worker: soft signal, grace period, then kill.
    KillWorker { id: WorkerId },
    /// Insert `task` into the pending queue, ordered by `(priority,
    /// created_at)`. Not itself logged to the WAL — the Task Queue is
    /// restored from the queue snapshot, not event replay, so callers
    /// pair this with `PersistQueueSnapshot`.
    EnqueueTask { task: Task },
    /// Send `task` to `worker` on its task pipe (`{op:"run", task:{...}}`).
    DispatchTask { worker: WorkerId, task: Task },
    /// Send `{op:"cancel"}` to a worker's task pipe.
    CancelTask { worker: WorkerId, task_id: TaskId },
    /// Send `{op:"shutdown"}` to a worker's task pipe.
    ShutdownWorker { worker: WorkerId },
    /// Reply to a worker's `tool_call_proposed` event with the Safety
    /// Gate's verdict, the one synchronous round-trip in the protocol.
    SendToolDecision {
        worker: WorkerId,
        allow: bool,
        reason: Option<String>,
    },
    /// Arm a scheduler timer, replacing any existing timer with the same id.
    SetTimer {
        id: String,
        #[serde(with = "duration_millis")]
        duration: Duration,
    },
    /// Disarm a scheduler timer.
    CancelTimer { id: String },
    /// Send a message to the owner over the Chat Transport.
    SendChatMessage {
        chat_id: ChatId,
        text: String,
        markdown: bool,
    },
    /// Write the current pending+running queue snapshot to disk.
    PersistQueueSnapshot { reason: String },
    /// Re-exec the supervisor binary with its original arguments, as the
    /// final step of a safe restart.
    ReExec,
    /// Exit the process immediately with `code`, as `/panic` does.
    /// Unlike `ReExec`, nothing replaces this process — the operator
    /// must start it again.
    ExitProcess { code: i32 },
}

impl Effect {
    /// Stable name used for tracing spans and log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Effect::Emit { .. } => "emit",
            Effect::SpawnWorker { .. } => "spawn_worker",
            Effect::KillWorker { .. } => "kill_worker",
            Effect::EnqueueTask { .. } => "enqueue_task",
            Effect::DispatchTask { .. } => "dispatch_task",
            Effect::CancelTask { .. } => "cancel_task",
            Effect::ShutdownWorker { .. } => "shutdown_worker",
            Effect::SendToolDecision { .. } => "send_tool_decision",
            Effect::SetTimer { .. } => "set_timer",
            Effect::CancelTimer { .. } => "cancel_timer",
            Effect::SendChatMessage { .. } => "send_chat_message",
            Effect::PersistQueueSnapshot { .. } => "persist_queue_snapshot",
            Effect::ReExec => "re_exec",
            Effect::ExitProcess { .. } => "exit_process",
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
#[path = "effect_tests.rs"]
mod tests;
