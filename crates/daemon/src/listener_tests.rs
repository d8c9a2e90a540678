use super::*;
use ouro_adapters::{FakeChatTransport, FakeSafetyClassifier, FakeWorkerProcessAdapter};
use ouro_core::FakeClock;
use ouro_engine::{Executor, RuntimeConfig, RuntimeDeps, SafetyGate};
use ouro_storage::Wal;
use tempfile::tempdir;
use tokio::sync::mpsc;

fn make_ctx(dir: &std::path::Path) -> (ListenCtx, Arc<Mutex<Wal>>) {
    let worker_process = Arc::new(FakeWorkerProcessAdapter::new());
    let chat_transport = Arc::new(FakeChatTransport::new());
    let state = Arc::new(Mutex::new(MaterializedState::default()));
    let wal = Wal::open(&dir.join("wal.jsonl"), 0).unwrap();
    let (event_bus, reader) = EventBus::new(wal);
    let wal_handle = reader.wal();
    let scheduler = Arc::new(Mutex::new(ouro_engine::Scheduler::new()));
    let (event_tx, _rx) = mpsc::channel(16);
    let executor = Executor::new(
        worker_process,
        chat_transport,
        Arc::clone(&state),
        Arc::clone(&wal_handle),
        Arc::clone(&scheduler),
        FakeClock::new(),
        event_tx,
        dir.join("snapshot.json"),
    );
    let safety_gate = Arc::new(SafetyGate::new(
        Arc::new(FakeSafetyClassifier::new()),
        "policy",
    ));
    let runtime = Arc::new(ouro_engine::Runtime::new(RuntimeDeps {
        executor,
        scheduler,
        safety_gate,
        config: RuntimeConfig::default(),
        clock: FakeClock::new(),
    }));
    (
        ListenCtx {
            state,
            runtime,
            event_bus,
            start_time: Instant::now(),
            max_workers: 3,
            budget_limit_usd: 10.0,
            shutdown_notify: Arc::new(Notify::new()),
        },
        wal_handle,
    )
}

#[tokio::test]
async fn ping_is_answered_with_pong() {
    let dir = tempdir().unwrap();
    let (ctx, _wal) = make_ctx(dir.path());
    assert!(matches!(
        handle_request(Request::Ping, &ctx).await,
        Response::Pong
    ));
}

#[tokio::test]
async fn status_reports_current_state() {
    let dir = tempdir().unwrap();
    let (ctx, _wal) = make_ctx(dir.path());
    match handle_request(Request::Status, &ctx).await {
        Response::Status(report) => {
            assert_eq!(report.max_workers, 3);
            assert_eq!(report.pending_tasks, 0);
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn chat_command_is_queued_onto_the_event_bus() {
    let dir = tempdir().unwrap();
    let (ctx, wal) = make_ctx(dir.path());

    let response = handle_request(
        Request::Chat {
            text: "/panic".into(),
        },
        &ctx,
    )
    .await;
    assert!(matches!(response, Response::ChatReply { text: None }));

    let mut wal = wal.lock();
    let entry = wal.next_unprocessed().unwrap().expect("event queued");
    assert!(matches!(entry.event, Event::ChatIn { text, .. } if text == "/panic"));
}

#[tokio::test]
async fn shutdown_without_kill_just_notifies() {
    let dir = tempdir().unwrap();
    let (ctx, _wal) = make_ctx(dir.path());
    let notified = ctx.shutdown_notify.clone();

    let response = handle_request(Request::Shutdown { kill: false }, &ctx).await;
    assert!(matches!(response, Response::Ok));

    tokio::time::timeout(std::time::Duration::from_millis(50), notified.notified())
        .await
        .expect("shutdown notify fired");
}
