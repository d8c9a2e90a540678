// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn llm_usage_accumulates_spend_and_cost_event_count() {
    let mut state = MaterializedState::default();
    state.budget_limit_usd = 100.0;
    let worker_id = WorkerId::new("worker-1".to_string());

    state.apply_event(&Event::LlmUsage {
        worker_id: worker_id.clone(),
        ts: 0,
        usage: usage(1.5),
    });
    state.apply_event(&Event::LlmUsage {
        worker_id,
        ts: 1,
        usage: usage(2.0),
    });

    assert_eq!(state.spent_usd, 3.5);
    assert_eq!(state.cost_event_count, 2);
    assert!(!state.budget_exhausted);
}

#[test]
fn spend_crossing_limit_sets_budget_exhausted() {
    let mut state = MaterializedState::default();
    state.budget_limit_usd = 5.0;
    let worker_id = WorkerId::new("worker-1".to_string());

    state.apply_event(&Event::LlmUsage {
        worker_id,
        ts: 0,
        usage: usage(6.0),
    });

    assert!(state.budget_exhausted);
}

#[test]
fn task_done_usage_counts_toward_budget() {
    let mut state = MaterializedState::default();
    state.budget_limit_usd = 10.0;
    let worker_id = WorkerId::new("worker-1".to_string());
    state.enqueue_pending(new_task("t1", TaskKind::Adhoc, 0, 0));
    state.assign_next_pending(&worker_id, 0);

    state.apply_event(&task_done("t1", worker_id.as_str(), "ok", Some(usage(4.0))));

    assert_eq!(state.spent_usd, 4.0);
}

#[test]
fn budget_exhausted_event_cancels_all_active_work() {
    let mut state = MaterializedState::default();
    let worker_id = WorkerId::new("worker-1".to_string());
    state.enqueue_pending(new_task("pending-1", TaskKind::Adhoc, 0, 0));
    state.enqueue_pending(new_task("running-1", TaskKind::Adhoc, 0, 1));
    state.assign_next_pending(&worker_id, 0);

    state.apply_event(&Event::BudgetExhausted { ts: 0 });

    assert!(state.budget_exhausted);
    assert!(state.pending.is_empty());
    assert!(state.running.is_empty());
    assert_eq!(state.task_log.len(), 2);
}

#[test]
fn budget_exhausted_is_sticky_once_set() {
    let mut state = MaterializedState::default();
    state.budget_limit_usd = 1.0;
    state.budget_exhausted = true;

    let worker_id = WorkerId::new("worker-1".to_string());
    state.apply_event(&Event::LlmUsage {
        worker_id,
        ts: 0,
        usage: usage(0.0),
    });

    assert!(state.budget_exhausted);
}
