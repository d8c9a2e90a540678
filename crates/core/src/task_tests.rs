// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn task(priority: i32, created_at: u64) -> Task {
    Task::new(TaskId::new("t1"), TaskKind::Adhoc, priority, "{}".into(), created_at)
}

#[test]
fn new_task_starts_pending_and_unassigned() {
    let t = task(0, 0);
    assert_eq!(t.status, TaskStatus::Pending);
    assert!(t.assigned_to.is_none());
    assert!(t.started_at.is_none());
    assert_eq!(t.deadline_soft, DEFAULT_DEADLINE_SOFT);
    assert_eq!(t.deadline_hard, DEFAULT_DEADLINE_HARD);
}

#[test]
fn order_key_breaks_ties_by_creation_time() {
    let a = task(1, 100);
    let b = task(1, 50);
    assert!(b.order_key() < a.order_key());
}

#[test]
fn assign_sets_running_state() {
    let mut t = task(0, 0);
    t.assign(WorkerId::new("w1"), 42);
    assert_eq!(t.status, TaskStatus::Running);
    assert_eq!(t.assigned_to, Some(WorkerId::new("w1")));
    assert_eq!(t.started_at, Some(42));
}

#[test]
fn requeue_after_loss_boosts_priority_and_marks_retried() {
    let mut t = task(5, 0);
    t.assign(WorkerId::new("w1"), 1);
    t.requeue_after_loss();
    assert_eq!(t.status, TaskStatus::Pending);
    assert!(t.assigned_to.is_none());
    assert!(t.started_at.is_none());
    assert_eq!(t.priority, 4);
    assert!(t.retried);
    assert_eq!(t.retry_count, 1);
}

#[test]
fn retry_cap_is_one() {
    let mut t = task(0, 0);
    assert!(t.can_retry());
    t.requeue_after_loss();
    assert!(!t.can_retry());
}

#[test]
fn terminal_statuses_are_recognized() {
    for status in [
        TaskStatus::Done,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
        TaskStatus::TimedOut,
    ] {
        assert!(status.is_terminal());
    }
    assert!(!TaskStatus::Pending.is_terminal());
    assert!(!TaskStatus::Running.is_terminal());
}

#[test]
fn deadlines_round_trip_through_json_as_seconds() {
    let t = task(0, 0).with_deadlines(Duration::from_secs(12), Duration::from_secs(34));
    let json = serde_json::to_value(&t).expect("serialize");
    assert_eq!(json["deadline_soft"], 12);
    assert_eq!(json["deadline_hard"], 34);
    let back: Task = serde_json::from_value(json).expect("deserialize");
    assert_eq!(back.deadline_soft, Duration::from_secs(12));
}
