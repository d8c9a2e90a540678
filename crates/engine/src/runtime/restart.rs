// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Restart coordinator: the "safe restart" protocol that rescues unsynced
//! repository state, kills every worker, and re-execs the supervisor
//! binary. Guarded by an exclusive file lock so the outgoing supervisor
//! and a racing second `/restart` can't both proceed.

use crate::executor::Executor;
use ouro_adapters::{run_with_timeout, ChatTransport, WorkerProcessAdapter, GIT_TIMEOUT};
use ouro_core::{Clock, Effect};
use std::fs::File;
use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;

/// What to do when the dev branch has commits the stable branch doesn't.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsyncedPolicy {
    /// Tag a rescue branch, then reset dev to stable.
    RescueAndReset,
    /// Abort the restart instead of touching the repository.
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartOutcome {
    pub ok: bool,
    pub message: String,
}

impl RestartOutcome {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RestartError {
    #[error("a restart is already in progress")]
    AlreadyRestarting,
    #[error("dev branch has unsynced commits")]
    HasUnsynced,
    #[error("git operation failed: {0}")]
    Git(String),
    #[error(transparent)]
    Execute(#[from] crate::executor::ExecuteError),
}

/// Drives the safe-restart sequence. Holds the lock file path (a plain
/// file used with an advisory exclusive lock, same mechanism as the
/// state store's write lock) and the path to the managed repository's
/// working tree.
pub struct RestartCoordinator {
    lock_path: PathBuf,
    repo_path: PathBuf,
}

impl RestartCoordinator {
    pub fn new(lock_path: PathBuf, repo_path: PathBuf) -> Self {
        Self {
            lock_path,
            repo_path,
        }
    }

    /// Run the full sequence: acquire the restart lock, snapshot the
    /// queue, rescue or fail on unsynced dev commits, kill every worker,
    /// then re-exec the supervisor binary. The lock is released by
    /// process exit (either this one, on `ReExec`, or by `File`'s drop on
    /// an early error return).
    pub async fn safe_restart<W, C, Ck>(
        &self,
        reason: &str,
        policy: UnsyncedPolicy,
        now_ms: u64,
        executor: &Executor<W, C, Ck>,
    ) -> Result<RestartOutcome, RestartError>
    where
        W: WorkerProcessAdapter,
        C: ChatTransport,
        Ck: Clock,
    {
        let lock_file = self.acquire_lock()?;

        executor
            .execute(Effect::PersistQueueSnapshot {
                reason: format!("safe_restart: {reason}"),
            })
            .await?;

        if let Err(e) = self.reconcile_unsynced(policy, now_ms).await {
            drop(lock_file);
            return Err(e);
        }

        let worker_ids: Vec<_> = executor.state().lock().workers.keys().cloned().collect();
        for id in worker_ids {
            executor.execute(Effect::KillWorker { id }).await?;
        }

        tracing::warn!(reason, "safe restart: re-executing supervisor binary");
        executor.execute(Effect::ReExec).await?;

        // Unreachable in production (`ReExec` calls `process::exit`), kept
        // for the fake executor paths exercised in tests.
        Ok(RestartOutcome::ok("restarting"))
    }

    fn acquire_lock(&self) -> Result<File, RestartError> {
        use fs2::FileExt;

        if let Some(parent) = self.lock_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.lock_path)
            .map_err(|e| RestartError::Git(format!("opening restart lock: {e}")))?;
        file.try_lock_exclusive()
            .map_err(|_| RestartError::AlreadyRestarting)?;
        Ok(file)
    }

    async fn reconcile_unsynced(
        &self,
        policy: UnsyncedPolicy,
        now_ms: u64,
    ) -> Result<(), RestartError> {
        let ahead = self.commits_ahead("stable", "dev").await?;
        if ahead == 0 {
            return Ok(());
        }

        match policy {
            UnsyncedPolicy::Fail => Err(RestartError::HasUnsynced),
            UnsyncedPolicy::RescueAndReset => {
                let rescue_branch = format!("rescue-{now_ms}");
                self.git(&["branch", &rescue_branch, "dev"]).await?;
                self.git(&["branch", "-f", "dev", "stable"]).await?;
                tracing::warn!(rescue_branch, ahead, "rescued unsynced dev commits before reset");
                Ok(())
            }
        }
    }

    /// Number of commits on `head` that aren't reachable from `base`.
    async fn commits_ahead(&self, base: &str, head: &str) -> Result<u64, RestartError> {
        let range = format!("{base}..{head}");
        let mut cmd = Command::new("git");
        cmd.arg("rev-list").arg("--count").arg(&range);
        let output = self.run(cmd, "git rev-list --count").await?;
        let text = String::from_utf8_lossy(&output.stdout);
        text.trim()
            .parse::<u64>()
            .map_err(|e| RestartError::Git(format!("parsing rev-list count: {e}")))
    }

    async fn git(&self, args: &[&str]) -> Result<(), RestartError> {
        let mut cmd = Command::new("git");
        cmd.args(args);
        self.run(cmd, "git").await?;
        Ok(())
    }

    async fn run(
        &self,
        mut cmd: Command,
        description: &str,
    ) -> Result<std::process::Output, RestartError> {
        cmd.current_dir(&self.repo_path);
        let tokio_cmd = tokio::process::Command::from(cmd);
        let output = run_with_timeout(tokio_cmd, GIT_TIMEOUT, description)
            .await
            .map_err(RestartError::Git)?;
        if !output.status.success() {
            return Err(RestartError::Git(format!(
                "{description} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(output)
    }
}

impl From<RestartError> for RestartOutcome {
    fn from(e: RestartError) -> Self {
        RestartOutcome::err(e.to_string())
    }
}

#[cfg(test)]
#[path = "restart_tests.rs"]
mod tests;
