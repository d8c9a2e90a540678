// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

mod budget;
mod idempotency;
mod queue;
mod tasks;
mod workers;

use super::*;
use ouro_core::{FailureKind, Task, TaskId, TaskKind, UsageRecord, WorkerId};

pub(super) fn new_task(id: &str, kind: TaskKind, priority: i32, created_at: u64) -> Task {
    Task::new(
        TaskId::new(id.to_string()),
        kind,
        priority,
        format!("payload-{id}"),
        created_at,
    )
}

pub(super) fn usage(cost_usd: f64) -> UsageRecord {
    UsageRecord {
        prompt_tokens: 100,
        completion_tokens: 50,
        cost_usd,
    }
}

pub(super) fn task_started(task_id: &str, worker_id: &str, ts: u64) -> Event {
    Event::TaskStarted {
        task_id: TaskId::new(task_id.to_string()),
        worker_id: WorkerId::new(worker_id.to_string()),
        ts,
    }
}

pub(super) fn task_done(
    task_id: &str,
    worker_id: &str,
    result: &str,
    usage: Option<UsageRecord>,
) -> Event {
    Event::TaskDone {
        task_id: TaskId::new(task_id.to_string()),
        worker_id: WorkerId::new(worker_id.to_string()),
        ts: 0,
        result: result.to_string(),
        usage,
    }
}

pub(super) fn task_failed(
    task_id: &str,
    worker_id: &str,
    error: &str,
    kind: FailureKind,
    usage: Option<UsageRecord>,
) -> Event {
    Event::TaskFailed {
        task_id: TaskId::new(task_id.to_string()),
        worker_id: WorkerId::new(worker_id.to_string()),
        ts: 0,
        error: error.to_string(),
        kind,
        usage,
    }
}
