// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer identifier type for tracking scheduled timers.
//!
//! A `TimerId` names a delayed action registered with the scheduler:
//! worker liveness sweeps, the soft-timeout grace period before a task is
//! marked failed, the evolution auto-enqueue trigger, and the periodic
//! budget report to the owner.

use crate::task::TaskId;
use crate::worker::WorkerId;

crate::define_id! {
    /// Unique identifier for a scheduled timer.
    pub struct TimerId;
}

impl TimerId {
    /// Per-worker liveness timer, renewed on every heartbeat.
    pub fn liveness(worker_id: &WorkerId) -> Self {
        Self::new(format!("liveness:{worker_id}"))
    }

    pub fn is_liveness(&self) -> bool {
        self.0.starts_with("liveness:")
    }

    /// Grace period between a soft-timeout cancel signal and the synthetic
    /// `task_failed(timeout-soft)` event.
    pub fn soft_timeout_grace(task_id: &TaskId) -> Self {
        Self::new(format!("soft-grace:{task_id}"))
    }

    pub fn is_soft_timeout_grace(&self) -> bool {
        self.0.starts_with("soft-grace:")
    }

    /// Periodic check for whether an evolution task should be auto-enqueued.
    pub fn evolution_trigger() -> Self {
        Self::new("evolution-trigger")
    }

    pub fn is_evolution_trigger(&self) -> bool {
        self.0 == "evolution-trigger"
    }

    /// Periodic budget report to the owner, every N cost events.
    pub fn budget_report() -> Self {
        Self::new("budget-report")
    }

    pub fn is_budget_report(&self) -> bool {
        self.0 == "budget-report"
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
