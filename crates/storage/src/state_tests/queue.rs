// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn enqueue_orders_by_priority_then_creation_time() {
    let mut state = MaterializedState::default();
    state.enqueue_pending(new_task("low", TaskKind::Adhoc, 5, 100));
    state.enqueue_pending(new_task("high", TaskKind::Adhoc, 1, 200));
    state.enqueue_pending(new_task("mid", TaskKind::Adhoc, 3, 50));

    let order: Vec<&str> = state.pending.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(order, vec!["high", "mid", "low"]);
}

#[test]
fn enqueue_ties_broken_by_creation_time() {
    let mut state = MaterializedState::default();
    state.enqueue_pending(new_task("second", TaskKind::Adhoc, 1, 200));
    state.enqueue_pending(new_task("first", TaskKind::Adhoc, 1, 100));

    let order: Vec<&str> = state.pending.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(order, vec!["first", "second"]);
}

#[test]
fn enqueue_is_idempotent_for_pending_and_running() {
    let mut state = MaterializedState::default();
    let task = new_task("t1", TaskKind::Adhoc, 0, 0);
    state.enqueue_pending(task.clone());
    state.enqueue_pending(task.clone());
    assert_eq!(state.pending.len(), 1);

    let worker_id = WorkerId::new("worker-1".to_string());
    state.assign_next_pending(&worker_id, 1_000);
    assert!(state.pending.is_empty());
    assert_eq!(state.running.len(), 1);

    // Re-enqueuing a task already running must be a no-op: a task is
    // pending, running, or absent -- never both.
    state.enqueue_pending(task);
    assert!(state.pending.is_empty());
    assert_eq!(state.running.len(), 1);
}

#[test]
fn assign_next_pending_moves_head_of_queue_into_running() {
    let mut state = MaterializedState::default();
    state.enqueue_pending(new_task("a", TaskKind::Adhoc, 2, 0));
    state.enqueue_pending(new_task("b", TaskKind::Adhoc, 1, 0));

    let worker_id = WorkerId::new("worker-1".to_string());
    let assigned = state.assign_next_pending(&worker_id, 1_000).unwrap();

    assert_eq!(assigned.id.as_str(), "b");
    assert_eq!(assigned.assigned_to, Some(worker_id));
    assert_eq!(assigned.started_at, Some(1_000));
    assert_eq!(state.pending.len(), 1);
    assert_eq!(state.pending[0].id.as_str(), "a");
}

#[test]
fn assign_next_pending_on_empty_queue_returns_none() {
    let mut state = MaterializedState::default();
    let worker_id = WorkerId::new("worker-1".to_string());
    assert!(state.assign_next_pending(&worker_id, 0).is_none());
}

#[test]
fn remove_pending_returns_and_drops_task() {
    let mut state = MaterializedState::default();
    state.enqueue_pending(new_task("t1", TaskKind::Adhoc, 0, 0));

    let removed = state.remove_pending(&TaskId::new("t1".to_string()));
    assert!(removed.is_some());
    assert!(state.pending.is_empty());
    assert!(state.remove_pending(&TaskId::new("t1".to_string())).is_none());
}

#[test]
fn find_task_checks_both_running_and_pending() {
    let mut state = MaterializedState::default();
    state.enqueue_pending(new_task("pending-1", TaskKind::Adhoc, 0, 0));
    let worker_id = WorkerId::new("worker-1".to_string());
    state.enqueue_pending(new_task("running-1", TaskKind::Adhoc, 0, 1));
    state.assign_next_pending(&worker_id, 0);

    assert!(state.find_task(&TaskId::new("pending-1".to_string())).is_some());
    assert!(state.find_task(&TaskId::new("missing".to_string())).is_none());
}

#[test]
fn has_active_evolution_task_checks_pending_and_running() {
    let mut state = MaterializedState::default();
    assert!(!state.has_active_evolution_task());

    state.enqueue_pending(new_task("evo-1", TaskKind::Evolution, 0, 0));
    assert!(state.has_active_evolution_task());
}

#[test]
fn has_pending_review_task_ignores_other_kinds() {
    let mut state = MaterializedState::default();
    state.enqueue_pending(new_task("adhoc-1", TaskKind::Adhoc, 0, 0));
    assert!(!state.has_pending_review_task());

    state.enqueue_pending(new_task("review-1", TaskKind::Review, 0, 1));
    assert!(state.has_pending_review_task());
}

#[test]
fn purge_pending_evolution_removes_only_evolution_tasks() {
    let mut state = MaterializedState::default();
    state.enqueue_pending(new_task("evo-1", TaskKind::Evolution, 0, 0));
    state.enqueue_pending(new_task("adhoc-1", TaskKind::Adhoc, 0, 1));

    state.purge_pending_evolution();

    assert_eq!(state.pending.len(), 1);
    assert_eq!(state.pending[0].id.as_str(), "adhoc-1");
}

#[test]
fn cancel_all_active_moves_pending_and_running_to_task_log() {
    let mut state = MaterializedState::default();
    state.enqueue_pending(new_task("pending-1", TaskKind::Adhoc, 0, 0));
    let worker_id = WorkerId::new("worker-1".to_string());
    state.enqueue_pending(new_task("running-1", TaskKind::Adhoc, 0, 1));
    state.assign_next_pending(&worker_id, 0);

    state.cancel_all_active();

    assert!(state.pending.is_empty());
    assert!(state.running.is_empty());
    assert_eq!(state.task_log.len(), 2);
    assert!(state
        .task_log
        .iter()
        .all(|t| t.status == ouro_core::TaskStatus::Cancelled));
}
