// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tunables for the runtime and their defaults.

use std::time::Duration;

/// Default grace period between a soft-timeout cancel and the synthetic
/// `task_failed(timeout-soft)`.
pub const DEFAULT_SOFT_GRACE: Duration = Duration::from_secs(30);
/// Default staleness window before a worker is considered dead.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(30);
/// Default minimum gap between auto-enqueued evolution tasks.
pub const DEFAULT_EVOLUTION_INTERVAL: Duration = Duration::from_secs(30 * 60);
/// Default cadence, in cost events, of the owner-facing budget report.
pub const DEFAULT_BUDGET_REPORT_EVERY: u64 = 10;
/// Default chat log rotation threshold.
pub const DEFAULT_CHAT_LOG_ROTATE_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Clamped to 1..=10.
    pub max_workers: usize,
    pub budget_limit_usd: f64,
    pub soft_timeout_grace: Duration,
    pub stale_after: Duration,
    pub evolution_interval: Duration,
    pub budget_report_every: u64,
    /// The static safety policy document text, loaded from disk at
    /// startup. Kept as plain data rather than compiled-in rules so it
    /// can be edited without a rebuild.
    pub safety_policy: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_workers: 3,
            budget_limit_usd: 10.0,
            soft_timeout_grace: DEFAULT_SOFT_GRACE,
            stale_after: DEFAULT_STALE_AFTER,
            evolution_interval: DEFAULT_EVOLUTION_INTERVAL,
            budget_report_every: DEFAULT_BUDGET_REPORT_EVERY,
            safety_policy: String::new(),
        }
    }
}
