// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task: the unit of work dispatched to a worker.

use crate::worker::WorkerId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

crate::define_id! {
    /// Unique identifier for a task (short random hex).
    pub struct TaskId;
}

/// The kind of work a task represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Chat,
    Review,
    Evolution,
    Adhoc,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskKind::Chat => "chat",
            TaskKind::Review => "review",
            TaskKind::Evolution => "evolution",
            TaskKind::Adhoc => "adhoc",
        };
        f.write_str(s)
    }
}

/// Current lifecycle stage of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Done,
    Failed,
    Cancelled,
    TimedOut,
}

impl TaskStatus {
    /// A terminal task has left both the pending list and the running set.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Done | TaskStatus::Failed | TaskStatus::Cancelled | TaskStatus::TimedOut
        )
    }
}

/// Default soft deadline: 600 seconds.
pub const DEFAULT_DEADLINE_SOFT: Duration = Duration::from_secs(600);
/// Default hard deadline: 1800 seconds.
pub const DEFAULT_DEADLINE_HARD: Duration = Duration::from_secs(1800);

/// Retry cap: a task may be re-queued at most once.
pub const MAX_RETRY_COUNT: u32 = 1;

/// A unit of work dispatched to exactly one worker at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub priority: i32,
    pub payload: String,
    /// Milliseconds since epoch.
    pub created_at: u64,
    pub assigned_to: Option<WorkerId>,
    /// Milliseconds since epoch, set when assigned.
    pub started_at: Option<u64>,
    #[serde(with = "duration_secs")]
    pub deadline_soft: Duration,
    #[serde(with = "duration_secs")]
    pub deadline_hard: Duration,
    pub status: TaskStatus,
    pub result_summary: Option<String>,
    /// Number of times this task has been re-queued after a worker loss.
    pub retry_count: u32,
    /// Set once this task has been restored from a crash snapshot as a
    /// previously-running task; used only for diagnostics and the
    /// priority boost on restore.
    #[serde(default)]
    pub retried: bool,
}

impl Task {
    pub fn new(id: TaskId, kind: TaskKind, priority: i32, payload: String, created_at: u64) -> Self {
        Self {
            id,
            kind,
            priority,
            payload,
            created_at,
            assigned_to: None,
            started_at: None,
            deadline_soft: DEFAULT_DEADLINE_SOFT,
            deadline_hard: DEFAULT_DEADLINE_HARD,
            status: TaskStatus::Pending,
            result_summary: None,
            retry_count: 0,
            retried: false,
        }
    }

    pub fn with_deadlines(mut self, soft: Duration, hard: Duration) -> Self {
        self.deadline_soft = soft;
        self.deadline_hard = hard;
        self
    }

    /// Ordering key for the pending list: smaller priority first, ties
    /// broken by creation time.
    pub fn order_key(&self) -> (i32, u64) {
        (self.priority, self.created_at)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < MAX_RETRY_COUNT
    }

    /// Marks the task as assigned to `worker`, recording the start time.
    pub fn assign(&mut self, worker: WorkerId, now_ms: u64) {
        self.assigned_to = Some(worker);
        self.started_at = Some(now_ms);
        self.status = TaskStatus::Running;
    }

    /// Re-queues a previously running task as pending, bumping its
    /// priority by one step (toward the front) and marking it retried.
    pub fn requeue_after_loss(&mut self) {
        self.status = TaskStatus::Pending;
        self.assigned_to = None;
        self.started_at = None;
        self.priority -= 1;
        self.retried = true;
        self.retry_count += 1;
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.as_secs().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
