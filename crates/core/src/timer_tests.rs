// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn timer_id_display() {
    let id = TimerId::new("test-timer");
    assert_eq!(id.to_string(), "test-timer");
}

#[test]
fn timer_id_equality() {
    let id1 = TimerId::new("timer-1");
    let id2 = TimerId::new("timer-1");
    let id3 = TimerId::new("timer-2");

    assert_eq!(id1, id2);
    assert_ne!(id1, id3);
}

#[test]
fn timer_id_from_str() {
    let id: TimerId = "test".into();
    assert_eq!(id.as_str(), "test");
}

#[test]
fn timer_id_serde() {
    let id = TimerId::new("my-timer");
    let json = serde_json::to_string(&id).expect("serialize");
    assert_eq!(json, "\"my-timer\"");

    let parsed: TimerId = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(parsed, id);
}

#[test]
fn liveness_timer_id_format() {
    let id = TimerId::liveness(&WorkerId::new("w-1"));
    assert_eq!(id.as_str(), "liveness:w-1");
    assert!(id.is_liveness());
}

#[test]
fn soft_timeout_grace_timer_id_format() {
    let id = TimerId::soft_timeout_grace(&TaskId::new("t-1"));
    assert_eq!(id.as_str(), "soft-grace:t-1");
    assert!(id.is_soft_timeout_grace());
    assert!(!id.is_liveness());
}

#[test]
fn evolution_trigger_is_a_singleton_timer() {
    let a = TimerId::evolution_trigger();
    let b = TimerId::evolution_trigger();
    assert_eq!(a, b);
    assert!(a.is_evolution_trigger());
}

#[test]
fn budget_report_is_a_singleton_timer() {
    let id = TimerId::budget_report();
    assert!(id.is_budget_report());
    assert!(!id.is_evolution_trigger());
}
