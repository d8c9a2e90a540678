// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ouro_core::TaskStatus;

#[test]
fn task_done_moves_running_task_to_log_as_done() {
    let mut state = MaterializedState::default();
    let worker_id = WorkerId::new("worker-1".to_string());
    state.enqueue_pending(new_task("t1", TaskKind::Adhoc, 0, 0));
    state.assign_next_pending(&worker_id, 0);

    state.apply_event(&task_done("t1", worker_id.as_str(), "all good", None));

    assert!(state.running.is_empty());
    assert_eq!(state.task_log.len(), 1);
    assert_eq!(state.task_log[0].status, TaskStatus::Done);
    assert_eq!(state.task_log[0].result_summary.as_deref(), Some("all good"));
}

#[test]
fn task_failed_with_retryable_kind_requeues_with_bumped_priority() {
    let mut state = MaterializedState::default();
    let worker_id = WorkerId::new("worker-1".to_string());
    state.enqueue_pending(new_task("t1", TaskKind::Adhoc, 5, 0));
    state.assign_next_pending(&worker_id, 0);

    state.apply_event(&task_failed(
        "t1",
        worker_id.as_str(),
        "worker crashed",
        FailureKind::WorkerCrash,
        None,
    ));

    assert!(state.running.is_empty());
    assert_eq!(state.pending.len(), 1);
    let requeued = &state.pending[0];
    assert_eq!(requeued.status, TaskStatus::Pending);
    assert!(requeued.retried);
    assert_eq!(requeued.retry_count, 1);
    assert_eq!(requeued.priority, 4);
}

#[test]
fn task_failed_exhausting_retry_cap_goes_terminal() {
    let mut state = MaterializedState::default();
    let worker_id = WorkerId::new("worker-1".to_string());
    let mut task = new_task("t1", TaskKind::Adhoc, 0, 0);
    task.retry_count = ouro_core::MAX_RETRY_COUNT;
    state.running.insert(task.id.clone(), task);

    state.apply_event(&task_failed(
        "t1",
        worker_id.as_str(),
        "still crashing",
        FailureKind::WorkerCrash,
        None,
    ));

    assert!(state.pending.is_empty());
    assert_eq!(state.task_log.len(), 1);
    assert_eq!(state.task_log[0].status, TaskStatus::Failed);
}

#[test]
fn task_failed_with_non_retryable_kind_goes_straight_to_failed() {
    let mut state = MaterializedState::default();
    let worker_id = WorkerId::new("worker-1".to_string());
    state.enqueue_pending(new_task("t1", TaskKind::Adhoc, 0, 0));
    state.assign_next_pending(&worker_id, 0);

    state.apply_event(&task_failed(
        "t1",
        worker_id.as_str(),
        "safety gate denied",
        FailureKind::Other,
        None,
    ));

    assert!(state.pending.is_empty());
    assert_eq!(state.task_log[0].status, TaskStatus::Failed);
}

#[test]
fn task_failed_with_timeout_kind_marks_timed_out() {
    let mut state = MaterializedState::default();
    let worker_id = WorkerId::new("worker-1".to_string());
    let mut task = new_task("t1", TaskKind::Adhoc, 0, 0);
    task.retry_count = ouro_core::MAX_RETRY_COUNT;
    state.running.insert(task.id.clone(), task);

    state.apply_event(&task_failed(
        "t1",
        worker_id.as_str(),
        "hard deadline exceeded",
        FailureKind::TimeoutHard,
        None,
    ));

    assert_eq!(state.task_log[0].status, TaskStatus::TimedOut);
}

#[test]
fn task_failed_with_cancelled_kind_marks_cancelled_regardless_of_retry_budget() {
    let mut state = MaterializedState::default();
    let worker_id = WorkerId::new("worker-1".to_string());
    state.enqueue_pending(new_task("t1", TaskKind::Adhoc, 0, 0));
    state.assign_next_pending(&worker_id, 0);

    state.apply_event(&task_failed(
        "t1",
        worker_id.as_str(),
        "safe restart in progress",
        FailureKind::Cancelled,
        None,
    ));

    assert_eq!(state.task_log[0].status, TaskStatus::Cancelled);
}

#[test]
fn task_log_is_capped_and_drops_oldest_first() {
    let mut state = MaterializedState::default();
    for i in 0..520 {
        let mut task = new_task(&format!("t{i}"), TaskKind::Adhoc, 0, i as u64);
        task.status = TaskStatus::Done;
        state.push_task_log(task);
    }

    assert_eq!(state.task_log.len(), 500);
    assert_eq!(state.task_log.first().unwrap().id.as_str(), "t20");
    assert_eq!(state.task_log.last().unwrap().id.as_str(), "t519");
}
