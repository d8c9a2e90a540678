use super::*;
use ouro_core::{Effect, Task, TaskId, TaskKind, Worker};
use parking_lot::Mutex;

fn state_with_worker(worker: Worker) -> Mutex<MaterializedState> {
    let mut s = MaterializedState::default();
    s.workers.insert(worker.id.clone(), worker);
    Mutex::new(s)
}

#[test]
fn spawn_workers_tops_up_to_max() {
    let state = Mutex::new(MaterializedState::default());
    let effects = spawn_workers(&state, 3, Duration::from_secs(30));
    let spawn_count = effects
        .iter()
        .filter(|e| matches!(e, Effect::SpawnWorker { .. }))
        .count();
    assert_eq!(spawn_count, 3);
    let timer_count = effects
        .iter()
        .filter(|e| matches!(e, Effect::SetTimer { .. }))
        .count();
    assert_eq!(timer_count, 3);
}

#[test]
fn spawn_workers_is_noop_when_already_full() {
    let w = Worker::new(ouro_core::WorkerId::new("w1"), 0);
    let state = state_with_worker(w);
    let effects = spawn_workers(&state, 1, Duration::from_secs(30));
    assert!(effects.is_empty());
}

#[test]
fn assign_tasks_hands_head_of_pending_to_idle_worker() {
    let w = Worker::new(ouro_core::WorkerId::new("w1"), 0);
    let state = state_with_worker(w.clone());
    state.lock().enqueue_pending(Task::new(
        TaskId::new("t1"),
        TaskKind::Adhoc,
        0,
        "do it".into(),
        0,
    ));

    let effects = assign_tasks(&state, 100);
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::DispatchTask { worker, task } if worker == &w.id && task.id == TaskId::new("t1")
    )));
    assert!(effects
        .iter()
        .any(|e| matches!(e, Effect::PersistQueueSnapshot { .. })));

    let s = state.lock();
    assert!(s.pending.is_empty());
    assert_eq!(s.running.len(), 1);
}

#[test]
fn assign_tasks_leaves_busy_worker_alone() {
    let mut w = Worker::new(ouro_core::WorkerId::new("w1"), 0);
    w.current_task_id = Some(TaskId::new("already-running"));
    let state = state_with_worker(w);
    state.lock().enqueue_pending(Task::new(
        TaskId::new("t1"),
        TaskKind::Adhoc,
        0,
        "do it".into(),
        0,
    ));

    let effects = assign_tasks(&state, 100);
    assert!(effects.is_empty());
    assert_eq!(state.lock().pending.len(), 1);
}

#[test]
fn assign_tasks_noop_when_queue_empty() {
    let w = Worker::new(ouro_core::WorkerId::new("w1"), 0);
    let state = state_with_worker(w);
    let effects = assign_tasks(&state, 100);
    assert!(effects.is_empty());
}

#[test]
fn ensure_workers_healthy_kills_and_fails_stale_worker_with_task() {
    let mut w = Worker::new(ouro_core::WorkerId::new("w1"), 0);
    w.current_task_id = Some(TaskId::new("t1"));
    let state = state_with_worker(w.clone());

    let effects = ensure_workers_healthy(&state, 60_000, Duration::from_secs(30));

    assert!(effects
        .iter()
        .any(|e| matches!(e, Effect::KillWorker { id } if id == &w.id)));
    assert!(effects
        .iter()
        .any(|e| matches!(e, Effect::CancelTimer { .. })));
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Emit { event: ouro_core::Event::TaskFailed { kind, .. } }
            if *kind == ouro_core::FailureKind::WorkerCrash
    )));
}

#[test]
fn ensure_workers_healthy_ignores_fresh_heartbeat() {
    let w = Worker::new(ouro_core::WorkerId::new("w1"), 59_000);
    let state = state_with_worker(w);
    let effects = ensure_workers_healthy(&state, 60_000, Duration::from_secs(30));
    assert!(effects.is_empty());
}

#[test]
fn ensure_workers_healthy_kills_idle_stale_worker_without_task_failure() {
    let w = Worker::new(ouro_core::WorkerId::new("w1"), 0);
    let state = state_with_worker(w.clone());
    let effects = ensure_workers_healthy(&state, 60_000, Duration::from_secs(30));
    assert!(effects
        .iter()
        .any(|e| matches!(e, Effect::KillWorker { id } if id == &w.id)));
    assert!(!effects
        .iter()
        .any(|e| matches!(e, Effect::Emit { event: ouro_core::Event::TaskFailed { .. } })));
}
