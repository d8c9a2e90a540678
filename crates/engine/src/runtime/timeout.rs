// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timeout enforcer: a periodic sweep over running tasks
//! that cancels anything past its soft deadline (giving the worker
//! `T_soft_grace` to exit cleanly before the task is failed outright) and
//! kills anything past its hard deadline immediately.

use crate::scheduler::Scheduler;
use ouro_core::{Effect, Event, FailureKind, TimerId};
use ouro_storage::MaterializedState;
use parking_lot::Mutex;
use std::time::Duration;

/// Sweep every running task for deadline violations. `soft_grace` is the
/// grace period armed on the scheduler before a soft-timeout becomes a
/// `task_failed` event; see [`TimerId::soft_timeout_grace`].
pub fn enforce(
    state: &Mutex<MaterializedState>,
    scheduler: &Mutex<Scheduler>,
    now_ms: u64,
    soft_grace: Duration,
) -> Vec<Effect> {
    let running: Vec<_> = state.lock().running.values().cloned().collect();
    let mut effects = Vec::new();

    for task in running {
        let Some(started_at) = task.started_at else {
            continue;
        };
        let elapsed_ms = now_ms.saturating_sub(started_at);
        let hard_ms = task.deadline_hard.as_millis() as u64;
        let soft_ms = task.deadline_soft.as_millis() as u64;

        if elapsed_ms >= hard_ms {
            if let Some(worker) = task.assigned_to.clone() {
                effects.push(Effect::KillWorker { id: worker.clone() });
                effects.push(Effect::Emit {
                    event: Event::TaskFailed {
                        worker_id: worker,
                        ts: now_ms,
                        task_id: task.id.clone(),
                        error: "hard deadline exceeded".into(),
                        kind: FailureKind::TimeoutHard,
                        usage: None,
                    },
                });
            }
            continue;
        }

        if elapsed_ms >= soft_ms {
            let grace_timer = TimerId::soft_timeout_grace(&task.id).to_string();
            let already_signaled = scheduler.lock().has_timer(&grace_timer);
            if !already_signaled {
                if let Some(worker) = task.assigned_to.clone() {
                    effects.push(Effect::CancelTask {
                        worker,
                        task_id: task.id.clone(),
                    });
                }
                effects.push(Effect::SetTimer {
                    id: grace_timer,
                    duration: soft_grace,
                });
            }
        }
    }

    effects
}

#[cfg(test)]
#[path = "timeout_tests.rs"]
mod tests;
