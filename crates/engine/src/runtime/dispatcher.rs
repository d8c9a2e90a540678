// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event dispatcher: the supervisor's single `Event -> Vec<Effect>`
//! decision point. Every event is first turned into
//! `Effect::Emit`, then matched for whatever side effects it implies;
//! the dispatcher only reads `MaterializedState`, it never mutates it —
//! that happens later, when the executor applies the `Emit` effect.

use crate::runtime::chat_router::{self, RouteOutcome};
use crate::runtime::config::RuntimeConfig;
use crate::safety_gate::SafetyGate;
use ouro_core::{Effect, Event, FailureKind, TimerId, UsageRecord, WorkerId};
use ouro_storage::MaterializedState;
use parking_lot::Mutex;
use std::sync::Arc;

/// Outcome of dispatching a single event: the effects to apply plus
/// whether it asked for a safe restart, which the caller drives through
/// the (async, multi-step) restart coordinator rather than an `Effect`.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    pub effects: Vec<Effect>,
    pub restart_requested: bool,
}

impl From<Vec<Effect>> for DispatchOutcome {
    fn from(effects: Vec<Effect>) -> Self {
        Self {
            effects,
            restart_requested: false,
        }
    }
}

pub struct Dispatcher {
    safety_gate: Arc<SafetyGate>,
    config: RuntimeConfig,
}

impl Dispatcher {
    pub fn new(safety_gate: Arc<SafetyGate>, config: RuntimeConfig) -> Self {
        Self {
            safety_gate,
            config,
        }
    }

    pub async fn dispatch(
        &self,
        event: Event,
        state: &Mutex<MaterializedState>,
        now_ms: u64,
    ) -> DispatchOutcome {
        let mut effects = vec![Effect::Emit {
            event: event.clone(),
        }];

        match event {
            Event::TaskProgress {
                task_id,
                message,
                ..
            } => {
                let is_chat = state
                    .lock()
                    .find_task(&task_id)
                    .map(|t| t.kind == ouro_core::TaskKind::Chat)
                    .unwrap_or(false);
                if is_chat {
                    if let Some(chat_id) = owner_chat_id(state) {
                        effects.push(Effect::SendChatMessage {
                            chat_id,
                            text: message,
                            markdown: false,
                        });
                    }
                }
            }

            Event::TaskDone {
                task_id,
                result,
                usage,
                ..
            } => {
                if let Some(chat_id) = owner_chat_id(state) {
                    effects.push(Effect::SendChatMessage {
                        chat_id,
                        text: format!("✅ task {} done: {result}", task_id.short(8)),
                        markdown: false,
                    });
                }
                if let Some(usage) = usage {
                    effects.extend(self.budget_check_effects(state, &usage, now_ms));
                }
            }

            Event::TaskFailed {
                task_id,
                error,
                kind,
                usage,
                ..
            } => {
                let silently_retried = state
                    .lock()
                    .find_task(&task_id)
                    .map(|t| kind.is_retryable() && t.can_retry())
                    .unwrap_or(false);
                if !silently_retried {
                    if let Some(chat_id) = owner_chat_id(state) {
                        let prefix = failure_prefix(kind);
                        effects.push(Effect::SendChatMessage {
                            chat_id,
                            text: format!("{prefix} task {} failed: {error}", task_id.short(8)),
                            markdown: false,
                        });
                    }
                }
                if let Some(usage) = usage {
                    effects.extend(self.budget_check_effects(state, &usage, now_ms));
                }
            }

            Event::ToolCallProposed {
                worker_id,
                tool,
                args,
                ..
            } => {
                if state.lock().budget_exhausted {
                    effects.push(Effect::SendToolDecision {
                        worker: worker_id,
                        allow: false,
                        reason: Some("budget exhausted".to_string()),
                    });
                    return effects.into();
                }
                let decision = self.safety_gate.check(&tool, &args).await;
                for usage in &decision.usage {
                    effects.push(Effect::Emit {
                        event: Event::LlmUsage {
                            worker_id: worker_id.clone(),
                            ts: now_ms,
                            usage: *usage,
                        },
                    });
                    effects.extend(self.budget_check_effects(state, usage, now_ms));
                }
                effects.push(Effect::SendToolDecision {
                    worker: worker_id,
                    allow: decision.allowed,
                    reason: decision.reason,
                });
            }

            Event::LlmUsage { usage, .. } => {
                effects.extend(self.budget_check_effects(state, &usage, now_ms));
            }

            Event::Heartbeat { worker_id, .. } => {
                effects.push(Effect::SetTimer {
                    id: TimerId::liveness(&worker_id).to_string(),
                    duration: self.config.stale_after,
                });
            }

            Event::ChatOut { text, markdown, .. } => {
                if let Some(chat_id) = owner_chat_id(state) {
                    effects.push(Effect::SendChatMessage {
                        chat_id,
                        text,
                        markdown,
                    });
                }
            }

            Event::RepoMutation { .. } => {}

            Event::ChatIn {
                chat_id, text, ts, ..
            } => {
                let RouteOutcome {
                    effects: routed,
                    restart_requested,
                } = chat_router::route(state, chat_id, text, ts);
                effects.extend(routed);
                return DispatchOutcome {
                    effects,
                    restart_requested,
                };
            }

            Event::TimerFired { id, .. } => {
                effects.extend(self.handle_timer(&id, state, now_ms));
            }

            Event::TaskStarted { .. }
            | Event::BudgetExhausted { .. }
            | Event::OwnerRegistered { .. }
            | Event::EvolutionModeSet { .. }
            | Event::BackgroundModeSet { .. }
            | Event::EmergencyStop { .. }
            | Event::Shutdown => {}
        }

        effects.into()
    }

    fn handle_timer(
        &self,
        id: &str,
        state: &Mutex<MaterializedState>,
        now_ms: u64,
    ) -> Vec<Effect> {
        let timer = TimerId::new(id.to_string());

        if timer.is_soft_timeout_grace() {
            let Some(task_id) = id.strip_prefix("soft-grace:") else {
                return Vec::new();
            };
            let task_id = ouro_core::TaskId::new(task_id);
            let still_running = {
                let s = state.lock();
                s.running.get(&task_id).cloned()
            };
            let Some(task) = still_running else {
                return Vec::new();
            };
            let worker_id = task.assigned_to.unwrap_or_else(|| WorkerId::new(""));
            return vec![Effect::Emit {
                event: Event::TaskFailed {
                    worker_id,
                    ts: now_ms,
                    task_id,
                    error: "soft deadline exceeded".into(),
                    kind: FailureKind::TimeoutSoft,
                    usage: None,
                },
            }];
        }

        if timer.is_liveness() {
            let Some(raw) = id.strip_prefix("liveness:") else {
                return Vec::new();
            };
            let worker_id = WorkerId::new(raw);
            let current_task = state
                .lock()
                .workers
                .get(&worker_id)
                .and_then(|w| w.current_task_id.clone());
            let mut effects = vec![Effect::KillWorker {
                id: worker_id.clone(),
            }];
            if let Some(task_id) = current_task {
                effects.push(Effect::Emit {
                    event: Event::TaskFailed {
                        worker_id,
                        ts: now_ms,
                        task_id,
                        error: "worker missed its liveness deadline".into(),
                        kind: FailureKind::WorkerCrash,
                        usage: None,
                    },
                });
            }
            return effects;
        }

        if timer.is_evolution_trigger() {
            let mut effects = vec![Effect::SetTimer {
                id: TimerId::evolution_trigger().to_string(),
                duration: self.config.evolution_interval,
            }];
            let should_enqueue = {
                let s = state.lock();
                s.evolution_mode_enabled
                    && !s.has_active_evolution_task()
                    && s.last_evolution_enqueued_at
                        .map(|last| {
                            now_ms.saturating_sub(last)
                                >= self.config.evolution_interval.as_millis() as u64
                        })
                        .unwrap_or(true)
            };
            if should_enqueue {
                let task = ouro_core::Task::new(
                    ouro_core::TaskId::new(format!("evolution-{now_ms}")),
                    ouro_core::TaskKind::Evolution,
                    -1,
                    String::new(),
                    now_ms,
                );
                effects.push(Effect::EnqueueTask { task });
                effects.push(Effect::PersistQueueSnapshot {
                    reason: "evolution trigger".into(),
                });
            }
            return effects;
        }

        Vec::new()
    }

    fn budget_check_effects(
        &self,
        state: &Mutex<MaterializedState>,
        usage: &UsageRecord,
        now_ms: u64,
    ) -> Vec<Effect> {
        let (prospective_spent, prospective_count, limit, already_exhausted, owner_chat) = {
            let s = state.lock();
            (
                s.spent_usd + usage.cost_usd,
                s.cost_event_count + 1,
                s.budget_limit_usd,
                s.budget_exhausted,
                s.owner.as_ref().map(|o| o.owner_chat_id.clone()),
            )
        };

        let mut effects = Vec::new();
        if !already_exhausted && limit > 0.0 && prospective_spent >= limit {
            effects.push(Effect::Emit {
                event: Event::BudgetExhausted { ts: now_ms },
            });
            if let Some(chat_id) = owner_chat {
                effects.push(Effect::SendChatMessage {
                    chat_id,
                    text: format!(
                        "💸 budget exhausted: ${prospective_spent:.2} spent of ${limit:.2} limit, all tasks cancelled"
                    ),
                    markdown: false,
                });
            }
        } else if self.config.budget_report_every > 0
            && prospective_count % self.config.budget_report_every == 0
        {
            if let Some(chat_id) = owner_chat {
                effects.push(Effect::SendChatMessage {
                    chat_id,
                    text: format!("💰 budget report: ${prospective_spent:.2} spent of ${limit:.2} limit"),
                    markdown: false,
                });
            }
        }
        effects
    }
}

fn failure_prefix(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::SafetyDenied => "⚠️",
        FailureKind::TimeoutSoft | FailureKind::TimeoutHard => "⏱️",
        FailureKind::Cancelled => "🚫",
        FailureKind::WorkerCrash | FailureKind::BudgetExhausted | FailureKind::Other => "❌",
    }
}

fn owner_chat_id(state: &Mutex<MaterializedState>) -> Option<ouro_core::ChatId> {
    state.lock().owner.as_ref().map(|o| o.owner_chat_id.clone())
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
