// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker identity and the record the supervisor keeps of each worker.
//!
//! The OS process handle itself is not a core data type — it lives behind
//! the `WorkerProcessAdapter` in `ouro-adapters` — but the bookkeeping the
//! pool needs (heartbeat, current task) is plain data and belongs here.

use crate::task::TaskId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a worker instance.
    pub struct WorkerId;
}

/// The supervisor's view of one worker process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    /// Milliseconds since epoch of the last heartbeat event received.
    pub last_heartbeat: u64,
    pub current_task_id: Option<TaskId>,
    /// Milliseconds since epoch of process spawn.
    pub start_time: u64,
}

impl Worker {
    pub fn new(id: WorkerId, now_ms: u64) -> Self {
        Self {
            id,
            last_heartbeat: now_ms,
            current_task_id: None,
            start_time: now_ms,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.current_task_id.is_none()
    }

    /// True when no heartbeat has arrived for at least `stale_after_ms`.
    pub fn is_stale(&self, now_ms: u64, stale_after_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_heartbeat) >= stale_after_ms
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
