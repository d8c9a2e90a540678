// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task breadcrumb files for crash-orphan detection.
//!
//! Breadcrumbs are write-only during normal operation. They capture a
//! snapshot of a running task on assignment and each status transition,
//! written as `<task-id>.crumb.json` alongside the daemon's log files.
//!
//! On daemon startup, breadcrumbs are scanned and cross-referenced against
//! the queue snapshot: a breadcrumb whose task the snapshot also lists as
//! `running` is expected (the owning worker is presumed dead, same as
//! every other running task after a crash); a breadcrumb with no matching
//! snapshot entry at all means the snapshot write itself was lost, and is
//! reported as an orphan so it doesn't silently vanish.

use ouro_core::{Task, TaskId, TaskStatus, WorkerId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Snapshot of one task's assignment, written on every status transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Breadcrumb {
    pub task_id: TaskId,
    pub worker_id: WorkerId,
    pub status: TaskStatus,
    /// Milliseconds since epoch the task started running, if known.
    pub started_at: Option<u64>,
}

/// Writes and deletes breadcrumb files alongside the daemon's per-task
/// activity. Failures are logged via tracing but never propagate —
/// breadcrumbs are a diagnostic aid, not load-bearing for correctness.
pub struct BreadcrumbWriter {
    dir: PathBuf,
}

impl BreadcrumbWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Write (or overwrite) the breadcrumb for a running task. No-op for
    /// a task with no assigned worker.
    pub fn write(&self, task: &Task) {
        let Some(worker_id) = task.assigned_to.clone() else {
            return;
        };
        let breadcrumb = Breadcrumb {
            task_id: task.id.clone(),
            worker_id,
            status: task.status,
            started_at: task.started_at,
        };
        let path = self.path_for(&breadcrumb.task_id);
        let tmp_path = path.with_extension("crumb.tmp");

        let result = std::fs::create_dir_all(&self.dir).and_then(|_| {
            let json = serde_json::to_string_pretty(&breadcrumb).map_err(std::io::Error::other)?;
            std::fs::write(&tmp_path, json.as_bytes())?;
            std::fs::rename(&tmp_path, &path)
        });
        if let Err(e) = result {
            tracing::warn!(task_id = %breadcrumb.task_id, error = %e, "failed to write breadcrumb");
        }
    }

    /// Delete the breadcrumb for a task that left the running set.
    pub fn delete(&self, task_id: &TaskId) {
        let path = self.path_for(task_id);
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!(%task_id, error = %e, "failed to delete breadcrumb");
            }
        }
    }

    fn path_for(&self, task_id: &TaskId) -> PathBuf {
        self.dir.join(format!("{}.crumb.json", task_id.as_str()))
    }
}

/// Scan `dir` for breadcrumb files, skipping ones that fail to parse.
pub fn scan(dir: &Path) -> Vec<Breadcrumb> {
    let mut breadcrumbs = Vec::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return breadcrumbs,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None => continue,
        };
        if !name.ends_with(".crumb.json") {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Breadcrumb>(&content) {
                Ok(b) => breadcrumbs.push(b),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping corrupt breadcrumb file");
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read breadcrumb file");
            }
        }
    }

    breadcrumbs
}

/// Breadcrumbs whose task id the queue snapshot's running set never
/// mentions: the snapshot write for that task was itself lost.
pub fn orphans_not_in_running_set<'a>(
    breadcrumbs: &'a [Breadcrumb],
    running: &std::collections::HashMap<TaskId, Task>,
) -> Vec<&'a Breadcrumb> {
    breadcrumbs
        .iter()
        .filter(|b| !running.contains_key(&b.task_id))
        .collect()
}

#[cfg(test)]
#[path = "breadcrumb_tests.rs"]
mod tests;
