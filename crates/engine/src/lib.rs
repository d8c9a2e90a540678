// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ouro-engine: the supervisor's decision logic.
//!
//! Pure `Event -> Vec<Effect>` dispatch, the worker pool, the timeout
//! enforcer, the safety gate, the restart coordinator, and the chat
//! command router all live here as logic over
//! [`ouro_storage::MaterializedState`]; the [`Executor`] is the only part
//! of this crate that performs I/O, applying
//! the `Effect`s this logic produces against the adapters in
//! `ouro-adapters`.

pub mod breadcrumb;
mod error;
mod executor;
mod runtime;
mod safety_gate;
mod scheduler;

pub use error::RuntimeError;
pub use executor::{ExecuteError, Executor};
pub use runtime::{
    Runtime, RuntimeConfig, RuntimeDeps, RestartCoordinator, RestartError, RestartOutcome,
    UnsyncedPolicy,
};
pub use safety_gate::{GateDecision, SafetyGate, MUTATING_TOOLS};
pub use scheduler::Scheduler;
