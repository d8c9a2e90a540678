use super::*;
use ouro_adapters::{FakeSafetyClassifier, Scripted};
use serde_json::json;
use std::sync::Arc;

fn gate(classifier: FakeSafetyClassifier) -> SafetyGate {
    SafetyGate::new(Arc::new(classifier), "do not do bad things")
}

#[tokio::test]
async fn non_mutating_tools_are_always_allowed() {
    let gate = gate(FakeSafetyClassifier::new());
    let decision = gate.check("read_file", &json!({"path": "a.txt"})).await;
    assert!(decision.allowed);
    assert!(decision.usage.is_empty());
}

#[tokio::test]
async fn fast_safe_allows_without_consulting_deep_tier() {
    let classifier =
        FakeSafetyClassifier::new().with_fast(Scripted::Verdict(Verdict::Safe));
    let gate = gate(classifier);
    let decision = gate.check("run_shell", &json!({"cmd": "ls"})).await;
    assert!(decision.allowed);
    assert_eq!(decision.usage.len(), 1);
}

#[tokio::test]
async fn fast_dangerous_escalates_and_deep_safe_allows() {
    let classifier = FakeSafetyClassifier::new()
        .with_fast(Scripted::Verdict(Verdict::Dangerous))
        .with_deep(Scripted::Verdict(Verdict::Safe));
    let gate = gate(classifier);
    let decision = gate.check("run_shell", &json!({"cmd": "ls"})).await;
    assert!(decision.allowed);
    assert_eq!(decision.usage.len(), 2);
}

#[tokio::test]
async fn fast_dangerous_escalates_and_deep_dangerous_denies() {
    let classifier = FakeSafetyClassifier::new()
        .with_fast(Scripted::Verdict(Verdict::Dangerous))
        .with_deep(Scripted::Verdict(Verdict::Dangerous));
    let gate = gate(classifier);
    let decision = gate.check("run_shell", &json!({"cmd": "rm -rf /"})).await;
    assert!(!decision.allowed);
    assert_eq!(decision.usage.len(), 2);
}

#[tokio::test]
async fn fast_unparseable_escalates_to_deep_safe() {
    let classifier = FakeSafetyClassifier::new()
        .with_fast(Scripted::Error)
        .with_deep(Scripted::Verdict(Verdict::Safe));
    let gate = gate(classifier);
    let decision = gate.check("code_edit", &json!({"path": "x.rs"})).await;
    assert!(decision.allowed);
    assert_eq!(decision.usage.len(), 1);
}

#[tokio::test]
async fn fast_and_deep_dangerous_denies_with_last_word() {
    let classifier = FakeSafetyClassifier::new()
        .with_fast(Scripted::Error)
        .with_deep(Scripted::Verdict(Verdict::Dangerous));
    let gate = gate(classifier);
    let decision = gate
        .check("repo_write_commit", &json!({"message": "oops"}))
        .await;
    assert!(!decision.allowed);
    assert!(decision.reason.is_some());
}

#[tokio::test]
async fn both_tiers_failing_denies_with_generic_reason() {
    let classifier = FakeSafetyClassifier::new()
        .with_fast(Scripted::Error)
        .with_deep(Scripted::Error);
    let gate = gate(classifier);
    let decision = gate.check("drive_write", &json!({"path": "x"})).await;
    assert!(!decision.allowed);
    assert_eq!(decision.reason.as_deref(), Some(GENERIC_DENY_REASON));
}
