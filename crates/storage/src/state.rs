// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state built from WAL replay.
//!
//! This is the state store plus the durable half of the task queue and
//! budget accountant: everything the supervisor needs to resume after a
//! crash or a safe restart, derived purely from replaying the event log.

use ouro_core::{
    ChatId, Event, FailureKind, OwnerId, Task, TaskId, TaskStatus, Worker, WorkerId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum number of terminal tasks kept in the rolling log.
const TASK_LOG_CAP: usize = 500;

/// The registered owner's identity and chat liveness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerRecord {
    pub owner_id: OwnerId,
    pub owner_chat_id: ChatId,
    /// Milliseconds since epoch of the last message received from the owner.
    pub last_owner_message_at: u64,
}

/// Materialized state derived from applying every [`Event`] in the WAL, in
/// order, to a [`MaterializedState::default()`] starting point.
///
/// # Idempotency requirement
///
/// All handlers in [`MaterializedState::apply_event`] must be idempotent:
/// applying the same event twice must produce the same state as applying it
/// once. Events are applied both for immediate in-memory visibility (by the
/// executor) and again during WAL replay at startup.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MaterializedState {
    /// `None` until first contact.
    #[serde(default)]
    pub owner: Option<OwnerRecord>,
    #[serde(default)]
    pub current_branch: Option<String>,
    #[serde(default)]
    pub last_commit_hash: Option<String>,
    /// Cumulative cost in USD since install. Monotonic non-decreasing.
    #[serde(default)]
    pub spent_usd: f64,
    /// Immutable after init; 0.0 means "unset" until config applies it.
    #[serde(default)]
    pub budget_limit_usd: f64,
    #[serde(default)]
    pub evolution_mode_enabled: bool,
    #[serde(default)]
    pub consciousness_running: bool,
    #[serde(default)]
    pub bootstrap_at: u64,
    /// Ordered by `(priority, created_at)`; re-sorted on every insert.
    #[serde(default)]
    pub pending: Vec<Task>,
    #[serde(default)]
    pub running: HashMap<TaskId, Task>,
    #[serde(default)]
    pub workers: HashMap<WorkerId, Worker>,
    /// Rolling log of terminal tasks (done/failed/cancelled/timed_out),
    /// capped at [`TASK_LOG_CAP`], oldest dropped first.
    #[serde(default)]
    pub task_log: Vec<Task>,
    /// Number of events dropped by the bounded per-worker event bus.
    #[serde(default)]
    pub events_dropped: u64,
    /// Count of `llm_usage`/budget-affecting events, for the periodic
    /// budget report cadence (every N cost events).
    #[serde(default)]
    pub cost_event_count: u64,
    /// Milliseconds since epoch of the last time an evolution task was
    /// enqueued, for the "elapsed-since-last-evolution" threshold.
    #[serde(default)]
    pub last_evolution_enqueued_at: Option<u64>,
    /// Set once `spent_usd >= budget_limit_usd`; sticky until a fresh
    /// install resets the budget.
    #[serde(default)]
    pub budget_exhausted: bool,
}

impl MaterializedState {
    /// A task is pending, running, or absent — never both.
    pub fn find_task(&self, id: &TaskId) -> Option<&Task> {
        self.running
            .get(id)
            .or_else(|| self.pending.iter().find(|t| &t.id == id))
    }

    /// Insert into the pending list, keeping `(priority, created_at)` order.
    pub fn enqueue_pending(&mut self, task: Task) {
        if self.pending.iter().any(|t| t.id == task.id) || self.running.contains_key(&task.id) {
            return;
        }
        self.pending.push(task);
        self.pending.sort_by_key(|t| t.order_key());
    }

    /// Remove a pending task by id, returning it if present.
    pub fn remove_pending(&mut self, id: &TaskId) -> Option<Task> {
        let idx = self.pending.iter().position(|t| &t.id == id)?;
        Some(self.pending.remove(idx))
    }

    /// Whether a pending or running evolution task already exists.
    pub fn has_active_evolution_task(&self) -> bool {
        self.pending
            .iter()
            .chain(self.running.values())
            .any(|t| t.kind == ouro_core::TaskKind::Evolution)
    }

    /// Whether a pending review task already exists.
    pub fn has_pending_review_task(&self) -> bool {
        self.pending
            .iter()
            .any(|t| t.kind == ouro_core::TaskKind::Review)
    }

    /// Assign the head-of-queue pending task (if any) for `worker`,
    /// atomically moving it into the running set.
    pub fn assign_next_pending(&mut self, worker: &WorkerId, now_ms: u64) -> Option<Task> {
        if self.pending.is_empty() {
            return None;
        }
        let mut task = self.pending.remove(0);
        task.assign(worker.clone(), now_ms);
        self.running.insert(task.id.clone(), task.clone());
        Some(task)
    }

    /// Append a task to the rolling terminal log, evicting the oldest entry
    /// past [`TASK_LOG_CAP`].
    fn push_task_log(&mut self, task: Task) {
        self.task_log.push(task);
        if self.task_log.len() > TASK_LOG_CAP {
            let excess = self.task_log.len() - TASK_LOG_CAP;
            self.task_log.drain(0..excess);
        }
    }

    /// Cancel every running and pending task, moving them into the
    /// terminal log as `Cancelled`. Used on budget exhaustion and at the
    /// start of a safe restart.
    pub fn cancel_all_active(&mut self) {
        let running: Vec<Task> = self.running.drain().map(|(_, t)| t).collect();
        for mut task in running {
            task.status = TaskStatus::Cancelled;
            self.push_task_log(task);
        }
        let pending: Vec<Task> = self.pending.drain(..).collect();
        for mut task in pending {
            task.status = TaskStatus::Cancelled;
            self.push_task_log(task);
        }
    }

    /// Purge pending evolution tasks (used by `/evolve off`).
    pub fn purge_pending_evolution(&mut self) {
        self.pending
            .retain(|t| t.kind != ouro_core::TaskKind::Evolution);
    }

    fn apply_llm_usage(&mut self, usage: &ouro_core::UsageRecord) {
        self.spent_usd += usage.cost_usd;
        self.cost_event_count += 1;
        if !self.budget_exhausted && self.spent_usd >= self.budget_limit_usd {
            self.budget_exhausted = true;
        }
    }

    /// Apply an event to derive state changes.
    ///
    /// See the struct-level docs for the idempotency requirement.
    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::TaskStarted { task_id, ts, .. } => {
                if let Some(task) = self.running.get_mut(task_id) {
                    if task.started_at.is_none() {
                        task.started_at = Some(*ts);
                    }
                }
            }

            Event::TaskProgress { .. } => {}

            Event::TaskDone {
                task_id,
                result,
                usage,
                ..
            } => {
                if let Some(mut task) = self.running.remove(task_id) {
                    task.status = TaskStatus::Done;
                    task.result_summary = Some(result.clone());
                    self.push_task_log(task);
                }
                if let Some(usage) = usage {
                    self.apply_llm_usage(usage);
                }
            }

            Event::TaskFailed {
                task_id,
                error,
                kind,
                usage,
                ..
            } => {
                if let Some(mut task) = self.running.remove(task_id) {
                    task.result_summary = Some(error.clone());
                    if kind.is_retryable() && task.can_retry() {
                        task.requeue_after_loss();
                        self.enqueue_pending(task);
                    } else {
                        task.status = match kind {
                            FailureKind::Cancelled => TaskStatus::Cancelled,
                            FailureKind::TimeoutSoft | FailureKind::TimeoutHard => {
                                TaskStatus::TimedOut
                            }
                            _ => TaskStatus::Failed,
                        };
                        self.push_task_log(task);
                    }
                }
                if let Some(usage) = usage {
                    self.apply_llm_usage(usage);
                }
            }

            Event::ToolCallProposed { .. } => {
                // Synchronous and answered inline by the dispatcher; no
                // persisted state change beyond the audit trail the WAL
                // already provides by storing the event itself.
            }

            Event::LlmUsage { usage, .. } => {
                self.apply_llm_usage(usage);
            }

            Event::Heartbeat { worker_id, ts } => {
                if let Some(worker) = self.workers.get_mut(worker_id) {
                    worker.last_heartbeat = *ts;
                }
            }

            Event::ChatOut { .. } => {}

            Event::RepoMutation { commit_hash, .. } => {
                self.last_commit_hash = Some(commit_hash.clone());
            }

            Event::ChatIn { chat_id, ts, .. } => {
                if let Some(owner) = &mut self.owner {
                    if &owner.owner_chat_id == chat_id {
                        owner.last_owner_message_at = *ts;
                    }
                }
            }

            Event::BudgetExhausted { .. } => {
                self.budget_exhausted = true;
                self.cancel_all_active();
            }

            Event::TimerFired { .. } => {}

            Event::OwnerRegistered {
                chat_id,
                owner_id,
                ts,
            } => {
                if self.owner.is_none() {
                    self.owner = Some(OwnerRecord {
                        owner_id: owner_id.clone(),
                        owner_chat_id: chat_id.clone(),
                        last_owner_message_at: *ts,
                    });
                }
            }

            Event::EvolutionModeSet { enabled, .. } => {
                self.evolution_mode_enabled = *enabled;
                if !*enabled {
                    self.purge_pending_evolution();
                }
            }

            Event::BackgroundModeSet { running, .. } => {
                self.consciousness_running = *running;
            }

            Event::EmergencyStop { .. } => {
                self.cancel_all_active();
                self.evolution_mode_enabled = false;
            }

            Event::Shutdown => {}
        }
    }
}

#[cfg(test)]
#[path = "state_tests/mod.rs"]
mod tests;
