use super::*;
use ouro_adapters::{FakeChatTransport, FakeWorkerProcessAdapter, WorkerCall};
use ouro_core::{ChatId, FakeClock, Task, TaskId, TaskKind, WorkerId};
use ouro_storage::Wal;
use tempfile::tempdir;
use tokio::sync::mpsc;

fn make_executor(
    dir: &std::path::Path,
) -> (
    Executor<FakeWorkerProcessAdapter, FakeChatTransport, FakeClock>,
    Arc<FakeWorkerProcessAdapter>,
    Arc<FakeChatTransport>,
    mpsc::Receiver<Event>,
) {
    let worker_process = Arc::new(FakeWorkerProcessAdapter::new());
    let chat_transport = Arc::new(FakeChatTransport::new());
    let state = Arc::new(Mutex::new(MaterializedState::default()));
    let wal = Arc::new(Mutex::new(Wal::open(&dir.join("wal.jsonl"), 0).unwrap()));
    let scheduler = Arc::new(Mutex::new(Scheduler::new()));
    let (event_tx, event_rx) = mpsc::channel(16);
    let executor = Executor::new(
        Arc::clone(&worker_process),
        Arc::clone(&chat_transport),
        state,
        wal,
        scheduler,
        FakeClock::new(),
        event_tx,
        dir.join("snapshot.json"),
    );
    (executor, worker_process, chat_transport, event_rx)
}

#[tokio::test]
async fn spawn_worker_registers_it_in_state() {
    let dir = tempdir().unwrap();
    let (executor, worker_process, _chat, _rx) = make_executor(dir.path());
    let id = WorkerId::new("w1");

    executor
        .execute(Effect::SpawnWorker { id: id.clone() })
        .await
        .unwrap();

    assert!(executor.state().lock().workers.contains_key(&id));
    assert_eq!(
        worker_process.calls.lock().as_slice(),
        &[WorkerCall::Spawn(id)]
    );
}

#[tokio::test]
async fn kill_worker_removes_it_from_state() {
    let dir = tempdir().unwrap();
    let (executor, _worker_process, _chat, _rx) = make_executor(dir.path());
    let id = WorkerId::new("w1");
    executor
        .execute(Effect::SpawnWorker { id: id.clone() })
        .await
        .unwrap();

    executor
        .execute(Effect::KillWorker { id: id.clone() })
        .await
        .unwrap();

    assert!(!executor.state().lock().workers.contains_key(&id));
}

#[tokio::test]
async fn dispatch_task_tracks_current_task_on_worker() {
    let dir = tempdir().unwrap();
    let (executor, worker_process, _chat, _rx) = make_executor(dir.path());
    let id = WorkerId::new("w1");
    executor
        .execute(Effect::SpawnWorker { id: id.clone() })
        .await
        .unwrap();
    let task = Task::new(TaskId::new("t1"), TaskKind::Adhoc, 0, "do it".into(), 0);

    executor
        .execute(Effect::DispatchTask {
            worker: id.clone(),
            task: task.clone(),
        })
        .await
        .unwrap();

    let state = executor.state();
    let state = state.lock();
    assert_eq!(
        state.workers.get(&id).unwrap().current_task_id,
        Some(task.id)
    );
    assert_eq!(
        worker_process.calls.lock().last(),
        Some(&WorkerCall::Dispatch(id, TaskId::new("t1")))
    );
}

#[tokio::test]
async fn enqueue_task_adds_to_pending() {
    let dir = tempdir().unwrap();
    let (executor, _worker_process, _chat, _rx) = make_executor(dir.path());
    let task = Task::new(TaskId::new("t1"), TaskKind::Review, 0, String::new(), 0);

    executor
        .execute(Effect::EnqueueTask { task: task.clone() })
        .await
        .unwrap();

    assert_eq!(executor.state().lock().pending.len(), 1);
}

#[tokio::test]
async fn send_chat_message_forwards_to_transport() {
    let dir = tempdir().unwrap();
    let (executor, _worker_process, chat_transport, _rx) = make_executor(dir.path());

    executor
        .execute(Effect::SendChatMessage {
            chat_id: ChatId::new("1"),
            text: "hello".into(),
            markdown: false,
        })
        .await
        .unwrap();

    assert_eq!(
        chat_transport.sent.lock().as_slice(),
        &[(ChatId::new("1"), "hello".to_string(), false)]
    );
}

#[tokio::test]
async fn emit_applies_to_state_and_appends_to_wal() {
    let dir = tempdir().unwrap();
    let (executor, _worker_process, _chat, _rx) = make_executor(dir.path());

    executor
        .execute(Effect::Emit {
            event: Event::BudgetExhausted { ts: 1 },
        })
        .await
        .unwrap();

    assert!(executor.state().lock().budget_exhausted);
    assert_eq!(executor.wal().lock().write_seq(), 1);
}

#[tokio::test]
async fn persist_queue_snapshot_writes_a_file() {
    let dir = tempdir().unwrap();
    let (executor, _worker_process, _chat, _rx) = make_executor(dir.path());

    executor
        .execute(Effect::PersistQueueSnapshot {
            reason: "test".into(),
        })
        .await
        .unwrap();

    assert!(dir.path().join("snapshot.json").exists());
}

#[tokio::test]
async fn send_tool_decision_forwards_to_worker_process() {
    let dir = tempdir().unwrap();
    let (executor, worker_process, _chat, _rx) = make_executor(dir.path());
    let id = WorkerId::new("w1");

    executor
        .execute(Effect::SendToolDecision {
            worker: id.clone(),
            allow: false,
            reason: Some("dangerous".into()),
        })
        .await
        .unwrap();

    assert_eq!(
        worker_process.calls.lock().as_slice(),
        &[WorkerCall::ToolDecision(id, false)]
    );
}

#[tokio::test]
async fn set_and_cancel_timer_round_trip_through_scheduler() {
    let dir = tempdir().unwrap();
    let (executor, _worker_process, _chat, _rx) = make_executor(dir.path());

    executor
        .execute(Effect::SetTimer {
            id: "soft_grace:t1".into(),
            duration: Duration::from_secs(30),
        })
        .await
        .unwrap();
    assert!(executor.scheduler().lock().has_timers());

    executor
        .execute(Effect::CancelTimer {
            id: "soft_grace:t1".into(),
        })
        .await
        .unwrap();
    assert!(!executor.scheduler().lock().has_timers());
}
