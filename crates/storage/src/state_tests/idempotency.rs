// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn task_done_applied_twice_is_idempotent() {
    let mut state = MaterializedState::default();
    let worker_id = WorkerId::new("worker-1".to_string());
    state.enqueue_pending(new_task("t1", TaskKind::Adhoc, 0, 0));
    state.assign_next_pending(&worker_id, 0);

    let event = task_done("t1", worker_id.as_str(), "ok", Some(usage(0.5)));
    state.apply_event(&event);
    let spent_after_first = state.spent_usd;
    let log_len_after_first = state.task_log.len();

    // Replaying the same event again (as WAL replay would) must not
    // double-count spend or push a duplicate log entry, since the task
    // is already gone from `running` by the time the duplicate arrives.
    state.apply_event(&event);

    assert_eq!(state.spent_usd, spent_after_first);
    assert_eq!(state.task_log.len(), log_len_after_first);
}

#[test]
fn heartbeat_applied_twice_is_idempotent() {
    let mut state = MaterializedState::default();
    let worker_id = WorkerId::new("worker-1".to_string());
    state
        .workers
        .insert(worker_id.clone(), ouro_core::Worker::new(worker_id.clone(), 0));

    let event = Event::Heartbeat {
        worker_id: worker_id.clone(),
        ts: 1_000,
    };
    state.apply_event(&event);
    state.apply_event(&event);

    assert_eq!(state.workers[&worker_id].last_heartbeat, 1_000);
}

#[test]
fn budget_exhausted_applied_twice_stays_exhausted_and_does_not_double_cancel() {
    let mut state = MaterializedState::default();
    state.enqueue_pending(new_task("t1", TaskKind::Adhoc, 0, 0));

    let event = Event::BudgetExhausted { ts: 0 };
    state.apply_event(&event);
    assert!(state.budget_exhausted);
    assert_eq!(state.task_log.len(), 1);

    state.apply_event(&event);
    assert!(state.budget_exhausted);
    assert_eq!(state.task_log.len(), 1);
}

#[test]
fn repo_mutation_applied_twice_keeps_latest_commit_hash() {
    let mut state = MaterializedState::default();
    let worker_id = WorkerId::new("worker-1".to_string());

    state.apply_event(&Event::RepoMutation {
        worker_id: worker_id.clone(),
        ts: 0,
        commit_hash: "abc123".to_string(),
    });
    state.apply_event(&Event::RepoMutation {
        worker_id,
        ts: 1,
        commit_hash: "abc123".to_string(),
    });

    assert_eq!(state.last_commit_hash.as_deref(), Some("abc123"));
}
