// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event sum type flowing from workers (and the chat transport) to the
//! supervisor's dispatcher, and persisted to the write-ahead log.
//!
//! Modeled as a tagged enum with one variant per `type` field, per the
//! design note that a closed match forces the dispatcher to handle every
//! variant.

use crate::owner::{ChatId, OwnerId};
use crate::task::TaskId;
use crate::worker::WorkerId;
use serde::{Deserialize, Serialize};

/// A single LLM usage record, reported by a worker or by the Safety Gate
/// on every classifier call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
}

/// Why a task failed, used to decide retry eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    WorkerCrash,
    TimeoutSoft,
    TimeoutHard,
    SafetyDenied,
    BudgetExhausted,
    Cancelled,
    Other,
}

impl FailureKind {
    /// Worker crash and hard timeout are the only retryable failure kinds.
    pub fn is_retryable(self) -> bool {
        matches!(self, FailureKind::WorkerCrash | FailureKind::TimeoutHard)
    }
}

/// Events flowing into the supervisor's single dispatch loop: the nine
/// worker-emitted kinds from the wire protocol, plus the handful of
/// internal events (chat inbound, timers, shutdown) the loop also folds
/// through the same dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "task_started")]
    TaskStarted {
        worker_id: WorkerId,
        ts: u64,
        task_id: TaskId,
    },
    #[serde(rename = "task_progress")]
    TaskProgress {
        worker_id: WorkerId,
        ts: u64,
        task_id: TaskId,
        message: String,
    },
    #[serde(rename = "task_done")]
    TaskDone {
        worker_id: WorkerId,
        ts: u64,
        task_id: TaskId,
        result: String,
        usage: Option<UsageRecord>,
    },
    #[serde(rename = "task_failed")]
    TaskFailed {
        worker_id: WorkerId,
        ts: u64,
        task_id: TaskId,
        error: String,
        kind: FailureKind,
        usage: Option<UsageRecord>,
    },
    #[serde(rename = "tool_call_proposed")]
    ToolCallProposed {
        worker_id: WorkerId,
        ts: u64,
        task_id: TaskId,
        tool: String,
        args: serde_json::Value,
    },
    #[serde(rename = "llm_usage")]
    LlmUsage {
        worker_id: WorkerId,
        ts: u64,
        usage: UsageRecord,
    },
    #[serde(rename = "heartbeat")]
    Heartbeat { worker_id: WorkerId, ts: u64 },
    #[serde(rename = "chat_out")]
    ChatOut {
        worker_id: WorkerId,
        ts: u64,
        text: String,
        markdown: bool,
    },
    #[serde(rename = "repo_mutation")]
    RepoMutation {
        worker_id: WorkerId,
        ts: u64,
        commit_hash: String,
    },

    /// Inbound message from the owner's chat, read off the Chat Transport
    /// and folded into the same loop that dispatches worker events.
    #[serde(rename = "chat_in")]
    ChatIn {
        chat_id: ChatId,
        text: String,
        ts: u64,
    },
    /// Raised by the Budget Accountant once `spent_usd` meets or exceeds
    /// `budget_limit_usd`.
    #[serde(rename = "budget_exhausted")]
    BudgetExhausted { ts: u64 },
    /// A scheduler timer has fired (soft-timeout grace, heartbeat sweep,
    /// evolution trigger, queue-poll, etc).
    #[serde(rename = "timer_fired")]
    TimerFired { id: String, ts: u64 },
    /// First-contact-wins owner registration.
    #[serde(rename = "owner_registered")]
    OwnerRegistered {
        chat_id: ChatId,
        owner_id: OwnerId,
        ts: u64,
    },
    /// Owner toggled evolution mode via `/evolve [on|off]`.
    #[serde(rename = "evolution_mode_set")]
    EvolutionModeSet { enabled: bool, ts: u64 },
    /// Owner toggled background ("consciousness") mode via `/bg
    /// [start|stop]`.
    #[serde(rename = "background_mode_set")]
    BackgroundModeSet { running: bool, ts: u64 },
    /// Owner invoked `/panic`: cancel every active task and disable
    /// evolution mode immediately.
    #[serde(rename = "emergency_stop")]
    EmergencyStop { ts: u64 },
    /// Graceful shutdown requested; never replayed from the WAL.
    #[serde(rename = "system_shutdown")]
    Shutdown,
}

impl Event {
    /// The worker that emitted this event, if any — internal events have
    /// none.
    pub fn worker_id(&self) -> Option<&WorkerId> {
        match self {
            Event::TaskStarted { worker_id, .. }
            | Event::TaskProgress { worker_id, .. }
            | Event::TaskDone { worker_id, .. }
            | Event::TaskFailed { worker_id, .. }
            | Event::ToolCallProposed { worker_id, .. }
            | Event::LlmUsage { worker_id, .. }
            | Event::Heartbeat { worker_id, .. }
            | Event::ChatOut { worker_id, .. }
            | Event::RepoMutation { worker_id, .. } => Some(worker_id),
            Event::ChatIn { .. }
            | Event::BudgetExhausted { .. }
            | Event::TimerFired { .. }
            | Event::OwnerRegistered { .. }
            | Event::EvolutionModeSet { .. }
            | Event::BackgroundModeSet { .. }
            | Event::EmergencyStop { .. }
            | Event::Shutdown => None,
        }
    }

    pub fn is_shutdown(&self) -> bool {
        matches!(self, Event::Shutdown)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
