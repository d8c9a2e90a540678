// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine runtime

use crate::ExecuteError;
use thiserror::Error;

/// Errors that can occur in the runtime
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("execute error: {0}")]
    Execute(#[from] ExecuteError),
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("worker not found: {0}")]
    WorkerNotFound(String),
    #[error("restart already in progress")]
    AlreadyRestarting,
    #[error("dev branch has unsynced commits")]
    HasUnsynced,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("git operation failed: {0}")]
    Git(String),
}
