// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ouro_core::Worker;

#[test]
fn heartbeat_updates_known_worker() {
    let mut state = MaterializedState::default();
    let worker_id = WorkerId::new("worker-1".to_string());
    state
        .workers
        .insert(worker_id.clone(), Worker::new(worker_id.clone(), 0));

    state.apply_event(&Event::Heartbeat {
        worker_id: worker_id.clone(),
        ts: 5_000,
    });

    assert_eq!(state.workers[&worker_id].last_heartbeat, 5_000);
}

#[test]
fn heartbeat_for_unknown_worker_is_ignored() {
    let mut state = MaterializedState::default();
    let worker_id = WorkerId::new("ghost".to_string());

    state.apply_event(&Event::Heartbeat {
        worker_id,
        ts: 5_000,
    });

    assert!(state.workers.is_empty());
}

#[test]
fn task_started_records_start_time_once() {
    let mut state = MaterializedState::default();
    let worker_id = WorkerId::new("worker-1".to_string());
    let task = new_task("t1", TaskKind::Adhoc, 0, 0);
    state.running.insert(task.id.clone(), task);

    state.apply_event(&task_started("t1", worker_id.as_str(), 1_000));
    assert_eq!(
        state.running[&TaskId::new("t1".to_string())].started_at,
        Some(1_000)
    );

    // A duplicate TaskStarted must not overwrite the first timestamp.
    state.apply_event(&task_started("t1", worker_id.as_str(), 2_000));
    assert_eq!(
        state.running[&TaskId::new("t1".to_string())].started_at,
        Some(1_000)
    );
}
