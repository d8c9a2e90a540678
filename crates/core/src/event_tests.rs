// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn task_done_round_trips_with_tagged_type_field() {
    let event = Event::TaskDone {
        worker_id: WorkerId::new("w1"),
        ts: 10,
        task_id: TaskId::new("t1"),
        result: "ok".into(),
        usage: Some(UsageRecord {
            prompt_tokens: 10,
            completion_tokens: 5,
            cost_usd: 0.01,
        }),
    };
    let json = serde_json::to_value(&event).expect("serialize");
    assert_eq!(json["type"], "task_done");
    assert_eq!(json["task_id"], "t1");
    let back: Event = serde_json::from_value(json).expect("deserialize");
    assert!(matches!(back, Event::TaskDone { .. }));
}

#[test]
fn shutdown_has_no_worker_id() {
    assert_eq!(Event::Shutdown.worker_id(), None);
    assert!(Event::Shutdown.is_shutdown());
}

#[test]
fn worker_events_expose_their_worker_id() {
    let event = Event::Heartbeat {
        worker_id: WorkerId::new("w9"),
        ts: 1,
    };
    assert_eq!(event.worker_id(), Some(&WorkerId::new("w9")));
}

#[test]
fn failure_kind_retry_classification_matches_spec() {
    assert!(FailureKind::WorkerCrash.is_retryable());
    assert!(FailureKind::TimeoutHard.is_retryable());
    assert!(!FailureKind::TimeoutSoft.is_retryable());
    assert!(!FailureKind::SafetyDenied.is_retryable());
    assert!(!FailureKind::BudgetExhausted.is_retryable());
    assert!(!FailureKind::Cancelled.is_retryable());
}

#[test]
fn chat_in_uses_chat_in_tag() {
    let event = Event::ChatIn {
        chat_id: ChatId::new("100"),
        text: "hi".into(),
        ts: 1,
    };
    let json = serde_json::to_value(&event).expect("serialize");
    assert_eq!(json["type"], "chat_in");
}
