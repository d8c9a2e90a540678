// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The runtime ties the worker pool, event dispatcher, timeout enforcer,
//! restart coordinator, and chat command router into the single decision
//! point the daemon's ~2Hz main loop drives once per tick.

mod chat_router;
pub mod config;
mod dispatcher;
mod pool;
mod restart;
mod timeout;

pub use config::RuntimeConfig;
pub use restart::{RestartCoordinator, RestartError, RestartOutcome, UnsyncedPolicy};

use crate::error::RuntimeError;
use crate::executor::Executor;
use crate::safety_gate::SafetyGate;
use crate::scheduler::Scheduler;
use dispatcher::Dispatcher;
use ouro_adapters::{ChatTransport, WorkerProcessAdapter};
use ouro_core::{Clock, Event};
use ouro_storage::MaterializedState;
use parking_lot::Mutex;
use std::sync::Arc;

/// Owns the executor, scheduler, and dispatcher, and exposes the handful
/// of operations the daemon's main loop and chat-command surface call
/// into. Generic over the worker-process, chat-transport, and clock
/// adapters so tests can substitute fakes — injected context, not global
/// symbols.
pub struct Runtime<W, C, Ck> {
    executor: Executor<W, C, Ck>,
    scheduler: Arc<Mutex<Scheduler>>,
    dispatcher: Dispatcher,
    config: RuntimeConfig,
    clock: Ck,
}

/// Constructor arguments for [`Runtime::new`], grouped because the
/// executor and scheduler are otherwise built in lockstep by the daemon's
/// startup sequence.
pub struct RuntimeDeps<W, C, Ck> {
    pub executor: Executor<W, C, Ck>,
    pub scheduler: Arc<Mutex<Scheduler>>,
    pub safety_gate: Arc<SafetyGate>,
    pub config: RuntimeConfig,
    pub clock: Ck,
}

impl<W, C, Ck> Runtime<W, C, Ck>
where
    W: WorkerProcessAdapter,
    C: ChatTransport,
    Ck: Clock,
{
    pub fn new(deps: RuntimeDeps<W, C, Ck>) -> Self {
        Self {
            executor: deps.executor,
            scheduler: deps.scheduler,
            dispatcher: Dispatcher::new(deps.safety_gate, deps.config.clone()),
            config: deps.config,
            clock: deps.clock,
        }
    }

    pub fn state(&self) -> Arc<Mutex<MaterializedState>> {
        self.executor.state()
    }

    pub fn scheduler(&self) -> Arc<Mutex<Scheduler>> {
        Arc::clone(&self.scheduler)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// One supervisor tick: reap fired timers, enforce deadlines, sweep
    /// worker liveness, top the pool back up to `max_workers`, and assign
    /// pending tasks to whoever's idle. Event-bus drain and the chat
    /// transport poll are the daemon's job — it calls [`Runtime::handle_event`]
    /// for each item it reads off of them, which this method does not do
    /// itself so that step ordering within a tick stays explicit at the
    /// call site.
    pub async fn tick(&self) -> Result<(), RuntimeError> {
        let now_ms = self.clock.epoch_ms();
        let now = self.clock.now();

        let fired = self.scheduler.lock().fired_timers(now, now_ms);
        for event in fired {
            self.handle_event(event).await?;
        }

        let timeout_effects = timeout::enforce(
            &self.executor.state(),
            &self.scheduler,
            now_ms,
            self.config.soft_timeout_grace,
        );
        self.executor.execute_all(timeout_effects).await?;

        let healthy_effects =
            pool::ensure_workers_healthy(&self.executor.state(), now_ms, self.config.stale_after);
        self.executor.execute_all(healthy_effects).await?;

        let spawn_effects = pool::spawn_workers(
            &self.executor.state(),
            self.config.max_workers,
            self.config.stale_after,
        );
        self.executor.execute_all(spawn_effects).await?;

        let assign_effects = pool::assign_tasks(&self.executor.state(), now_ms);
        self.executor.execute_all(assign_effects).await?;

        Ok(())
    }

    /// Dispatch one event (worker-emitted, chat-inbound, or internal
    /// timer) through the Event Dispatcher, applying whatever effects it
    /// implies. Returns whether the event asked for a safe restart
    /// (`/restart`): honoring that means running the restart coordinator,
    /// which is multi-step and async in a way no single `Effect` can
    /// express, so the caller drives it explicitly via
    /// [`Runtime::safe_restart`].
    pub async fn handle_event(&self, event: Event) -> Result<bool, RuntimeError> {
        let now_ms = self.clock.epoch_ms();
        let outcome = self
            .dispatcher
            .dispatch(event, &self.executor.state(), now_ms)
            .await;
        self.executor.execute_all(outcome.effects).await?;
        Ok(outcome.restart_requested)
    }

    /// Run the safe-restart protocol through `coordinator`.
    pub async fn safe_restart(
        &self,
        reason: &str,
        policy: UnsyncedPolicy,
        coordinator: &RestartCoordinator,
    ) -> Result<RestartOutcome, RestartError> {
        let now_ms = self.clock.epoch_ms();
        coordinator
            .safe_restart(reason, policy, now_ms, &self.executor)
            .await
    }

    /// Emergency stop: kill every worker immediately and mark the state
    /// shut down. Used by `/panic`, which exits the process right after.
    pub async fn kill_all_workers(&self) -> Result<(), RuntimeError> {
        let ids: Vec<_> = self.executor.state().lock().workers.keys().cloned().collect();
        for id in ids {
            self.executor
                .execute(ouro_core::Effect::KillWorker { id })
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
