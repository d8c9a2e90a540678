// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker pool operations: keeping the pool at
//! `max_workers`, assigning pending tasks to idle workers, and sweeping
//! for workers whose liveness timer lapsed without a renewing heartbeat.

use ouro_core::{Effect, Event, FailureKind, IdGen, TimerId, UuidIdGen, WorkerId};
use ouro_storage::MaterializedState;
use parking_lot::Mutex;
use std::time::Duration;

/// Spawn enough workers to bring the pool up to `max_workers`, arming each
/// one's liveness timer so an absent first heartbeat is itself detected as
/// staleness.
pub fn spawn_workers(
    state: &Mutex<MaterializedState>,
    max_workers: usize,
    stale_after: Duration,
) -> Vec<Effect> {
    let existing = state.lock().workers.len();
    let mut effects = Vec::new();
    for _ in existing..max_workers {
        let id = WorkerId::new(UuidIdGen.next());
        effects.push(Effect::SpawnWorker { id: id.clone() });
        effects.push(Effect::SetTimer {
            id: TimerId::liveness(&id).to_string(),
            duration: stale_after,
        });
    }
    effects
}

/// Hand the head of the pending queue to every idle worker, in priority
/// order, one task per worker per call.
pub fn assign_tasks(state: &Mutex<MaterializedState>, now_ms: u64) -> Vec<Effect> {
    let idle_workers: Vec<WorkerId> = {
        let s = state.lock();
        s.workers
            .values()
            .filter(|w| w.is_idle())
            .map(|w| w.id.clone())
            .collect()
    };

    let mut effects = Vec::new();
    for worker in idle_workers {
        let task = state.lock().assign_next_pending(&worker, now_ms);
        let Some(task) = task else {
            break;
        };
        effects.push(Effect::DispatchTask {
            worker,
            task,
        });
    }
    if !effects.is_empty() {
        effects.push(Effect::PersistQueueSnapshot {
            reason: "task assignment".into(),
        });
    }
    effects
}

/// Fallback sweep for workers whose liveness timer itself never fired
/// (e.g. the scheduler wasn't polled for a while): anything stale by wall
/// clock is killed and its task failed the same way a liveness timeout
/// would be, and a replacement is spawned on the next `spawn_workers`
/// call once the pool notices it's under `max_workers`.
pub fn ensure_workers_healthy(
    state: &Mutex<MaterializedState>,
    now_ms: u64,
    stale_after: Duration,
) -> Vec<Effect> {
    let stale_after_ms = stale_after.as_millis() as u64;
    let stale: Vec<WorkerId> = {
        let s = state.lock();
        s.workers
            .values()
            .filter(|w| w.is_stale(now_ms, stale_after_ms))
            .map(|w| w.id.clone())
            .collect()
    };

    let mut effects = Vec::new();
    for id in stale {
        let current_task = state
            .lock()
            .workers
            .get(&id)
            .and_then(|w| w.current_task_id.clone());
        effects.push(Effect::KillWorker { id: id.clone() });
        effects.push(Effect::CancelTimer {
            id: TimerId::liveness(&id).to_string(),
        });
        if let Some(task_id) = current_task {
            effects.push(Effect::Emit {
                event: Event::TaskFailed {
                    worker_id: id,
                    ts: now_ms,
                    task_id,
                    error: "worker missed its liveness deadline".into(),
                    kind: FailureKind::WorkerCrash,
                    usage: None,
                },
            });
        }
    }
    effects
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
