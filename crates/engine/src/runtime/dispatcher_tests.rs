use super::*;
use ouro_adapters::{FakeSafetyClassifier, Scripted, Verdict};
use ouro_core::{ChatId, OwnerId, Task, TaskId, TaskKind, UsageRecord, WorkerId};
use ouro_storage::OwnerRecord;
use serde_json::json;

fn dispatcher(classifier: FakeSafetyClassifier) -> Dispatcher {
    Dispatcher::new(
        Arc::new(SafetyGate::new(Arc::new(classifier), "policy text")),
        RuntimeConfig::default(),
    )
}

fn state_with_owner(chat_id: &str) -> Mutex<MaterializedState> {
    let mut s = MaterializedState::default();
    s.owner = Some(OwnerRecord {
        owner_id: OwnerId::new("owner-1"),
        owner_chat_id: ChatId::new(chat_id),
        last_owner_message_at: 0,
    });
    Mutex::new(s)
}

#[tokio::test]
async fn task_done_reports_to_owner_and_emits_underlying_event() {
    let state = state_with_owner("owner-chat");
    let d = dispatcher(FakeSafetyClassifier::new());
    let outcome = d
        .dispatch(
            Event::TaskDone {
                worker_id: WorkerId::new("w1"),
                ts: 0,
                task_id: TaskId::new("t1"),
                result: "all good".into(),
                usage: None,
            },
            &state,
            0,
        )
        .await;
    assert!(outcome
        .effects
        .iter()
        .any(|e| matches!(e, Effect::Emit { event: Event::TaskDone { .. } })));
    assert!(outcome.effects.iter().any(
        |e| matches!(e, Effect::SendChatMessage { chat_id, text, .. } if chat_id.as_str() == "owner-chat" && text.contains("done"))
    ));
    assert!(!outcome.restart_requested);
}

#[tokio::test]
async fn task_failed_retryable_within_cap_suppresses_owner_message() {
    let state = state_with_owner("owner-chat");
    let mut task = Task::new(TaskId::new("t1"), TaskKind::Adhoc, 0, String::new(), 0);
    task.assign(WorkerId::new("w1"), 0);
    state.lock().running.insert(task.id.clone(), task);

    let d = dispatcher(FakeSafetyClassifier::new());
    let outcome = d
        .dispatch(
            Event::TaskFailed {
                worker_id: WorkerId::new("w1"),
                ts: 0,
                task_id: TaskId::new("t1"),
                error: "crashed".into(),
                kind: ouro_core::FailureKind::WorkerCrash,
                usage: None,
            },
            &state,
            0,
        )
        .await;
    assert!(!outcome
        .effects
        .iter()
        .any(|e| matches!(e, Effect::SendChatMessage { .. })));
}

#[tokio::test]
async fn task_failed_non_retryable_notifies_owner_with_prefix() {
    let state = state_with_owner("owner-chat");
    let d = dispatcher(FakeSafetyClassifier::new());
    let outcome = d
        .dispatch(
            Event::TaskFailed {
                worker_id: WorkerId::new("w1"),
                ts: 0,
                task_id: TaskId::new("t1"),
                error: "denied".into(),
                kind: ouro_core::FailureKind::SafetyDenied,
                usage: None,
            },
            &state,
            0,
        )
        .await;
    assert!(outcome.effects.iter().any(
        |e| matches!(e, Effect::SendChatMessage { text, .. } if text.starts_with("\u{26a0}\u{fe0f}"))
    ));
}

#[tokio::test]
async fn tool_call_proposed_consults_gate_and_sends_decision() {
    let state = Mutex::new(MaterializedState::default());
    let classifier = FakeSafetyClassifier::new().with_fast(Scripted::Verdict(Verdict::Dangerous));
    let d = dispatcher(classifier);
    let outcome = d
        .dispatch(
            Event::ToolCallProposed {
                worker_id: WorkerId::new("w1"),
                ts: 0,
                task_id: TaskId::new("t1"),
                tool: "run_shell".into(),
                args: json!({"cmd": "rm -rf /"}),
            },
            &state,
            0,
        )
        .await;
    assert!(outcome.effects.iter().any(
        |e| matches!(e, Effect::SendToolDecision { allow, .. } if !allow)
    ));
}

#[tokio::test]
async fn tool_call_proposed_denies_without_consulting_gate_once_budget_exhausted() {
    let state = Mutex::new(MaterializedState::default());
    state.lock().budget_exhausted = true;
    let classifier = FakeSafetyClassifier::new();
    let d = dispatcher(classifier);
    let outcome = d
        .dispatch(
            Event::ToolCallProposed {
                worker_id: WorkerId::new("w1"),
                ts: 0,
                task_id: TaskId::new("t1"),
                tool: "run_shell".into(),
                args: json!({"cmd": "ls"}),
            },
            &state,
            0,
        )
        .await;
    assert!(outcome.effects.iter().any(
        |e| matches!(e, Effect::SendToolDecision { allow, reason, .. } if !allow && reason.as_deref() == Some("budget exhausted"))
    ));
}

#[tokio::test]
async fn llm_usage_over_limit_emits_budget_exhausted_and_warning() {
    let state = state_with_owner("owner-chat");
    state.lock().budget_limit_usd = 0.10;
    let d = dispatcher(FakeSafetyClassifier::new());
    let outcome = d
        .dispatch(
            Event::LlmUsage {
                worker_id: WorkerId::new("w1"),
                ts: 0,
                usage: UsageRecord {
                    prompt_tokens: 1,
                    completion_tokens: 1,
                    cost_usd: 0.15,
                },
            },
            &state,
            0,
        )
        .await;
    assert!(outcome
        .effects
        .iter()
        .any(|e| matches!(e, Effect::Emit { event: Event::BudgetExhausted { .. } })));
    assert!(outcome.effects.iter().any(
        |e| matches!(e, Effect::SendChatMessage { text, .. } if text.contains("\u{1f4b8}"))
    ));
}

#[tokio::test]
async fn heartbeat_rearms_liveness_timer() {
    let state = Mutex::new(MaterializedState::default());
    let d = dispatcher(FakeSafetyClassifier::new());
    let outcome = d
        .dispatch(
            Event::Heartbeat {
                worker_id: WorkerId::new("w1"),
                ts: 0,
            },
            &state,
            0,
        )
        .await;
    assert!(outcome
        .effects
        .iter()
        .any(|e| matches!(e, Effect::SetTimer { id, .. } if id == "liveness:w1")));
}

#[tokio::test]
async fn chat_in_routes_through_chat_router_and_surfaces_restart_request() {
    let state = Mutex::new(MaterializedState::default());
    let d = dispatcher(FakeSafetyClassifier::new());
    let outcome = d
        .dispatch(
            Event::ChatIn {
                chat_id: ChatId::new("100"),
                text: "/restart".into(),
                ts: 0,
            },
            &state,
            0,
        )
        .await;
    assert!(outcome.restart_requested);
    assert!(outcome
        .effects
        .iter()
        .any(|e| matches!(e, Effect::Emit { event: Event::OwnerRegistered { .. } })));
}
