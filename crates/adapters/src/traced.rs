// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::chat_transport::{ChatTransport, ChatTransportError, ChatUpdate};
use crate::safety_classifier::{
    ClassifierError, ClassifierOutcome, ClassifierTier, SafetyClassifier,
};
use crate::worker_process::{WorkerProcessAdapter, WorkerProcessError};
use async_trait::async_trait;
use ouro_core::{ChatId, Event, Task, TaskId, WorkerId};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::Instrument;

/// Wrapper that adds tracing to any [`WorkerProcessAdapter`].
pub struct TracedWorkerProcess<W> {
    inner: W,
}

impl<W> TracedWorkerProcess<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<W: WorkerProcessAdapter> WorkerProcessAdapter for TracedWorkerProcess<W> {
    async fn spawn(
        &self,
        id: &WorkerId,
        event_tx: mpsc::Sender<Event>,
    ) -> Result<(), WorkerProcessError> {
        async {
            let start = std::time::Instant::now();
            let result = self.inner.spawn(id, event_tx).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "worker spawned"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "spawn failed"),
            }
            result
        }
        .instrument(tracing::info_span!("worker.spawn", %id))
        .await
    }

    async fn dispatch_task(&self, id: &WorkerId, task: &Task) -> Result<(), WorkerProcessError> {
        let result = self.inner.dispatch_task(id, task).await;
        tracing::info_span!("worker.dispatch_task", %id, task_id = %task.id)
            .in_scope(|| match &result {
                Ok(()) => tracing::info!("dispatched"),
                Err(e) => tracing::error!(error = %e, "dispatch failed"),
            });
        result
    }

    async fn cancel_task(
        &self,
        id: &WorkerId,
        task_id: &TaskId,
    ) -> Result<(), WorkerProcessError> {
        let result = self.inner.cancel_task(id, task_id).await;
        tracing::info_span!("worker.cancel_task", %id, %task_id)
            .in_scope(|| match &result {
                Ok(()) => tracing::info!("cancelled"),
                Err(e) => tracing::warn!(error = %e, "cancel failed"),
            });
        result
    }

    async fn kill(&self, id: &WorkerId, grace: Duration) -> Result<(), WorkerProcessError> {
        let result = self.inner.kill(id, grace).await;
        tracing::info_span!("worker.kill", %id).in_scope(|| match &result {
            Ok(()) => tracing::info!("killed"),
            Err(e) => tracing::warn!(error = %e, "kill failed (may be expected)"),
        });
        result
    }

    async fn is_alive(&self, id: &WorkerId) -> bool {
        self.inner.is_alive(id).await
    }

    async fn send_tool_decision(
        &self,
        id: &WorkerId,
        allow: bool,
        reason: Option<&str>,
    ) -> Result<(), WorkerProcessError> {
        let result = self.inner.send_tool_decision(id, allow, reason).await;
        tracing::info_span!("worker.tool_decision", %id, allow).in_scope(|| {
            if let Err(e) = &result {
                tracing::warn!(error = %e, "tool decision send failed");
            }
        });
        result
    }
}

/// Wrapper that adds tracing to any [`ChatTransport`].
pub struct TracedChatTransport<C> {
    inner: C,
}

impl<C> TracedChatTransport<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: ChatTransport> ChatTransport for TracedChatTransport<C> {
    async fn fetch_updates(
        &self,
        offset: u64,
        timeout: Duration,
    ) -> Result<Vec<ChatUpdate>, ChatTransportError> {
        let result = self.inner.fetch_updates(offset, timeout).await;
        match &result {
            Ok(updates) if !updates.is_empty() => {
                tracing::debug!(count = updates.len(), "chat updates fetched")
            }
            Err(e) => tracing::warn!(error = %e, "chat fetch failed"),
            _ => {}
        }
        result
    }

    async fn send_message(
        &self,
        chat_id: &ChatId,
        text: &str,
        markdown: bool,
    ) -> Result<(), ChatTransportError> {
        let result = self.inner.send_message(chat_id, text, markdown).await;
        if let Err(ref e) = result {
            tracing::error!(%chat_id, error = %e, "chat send failed");
        }
        result
    }
}

/// Wrapper that adds tracing to any [`SafetyClassifier`].
pub struct TracedSafetyClassifier<S> {
    inner: S,
}

impl<S> TracedSafetyClassifier<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: SafetyClassifier> SafetyClassifier for TracedSafetyClassifier<S> {
    async fn classify(
        &self,
        tier: ClassifierTier,
        prompt: &str,
    ) -> Result<ClassifierOutcome, ClassifierError> {
        async {
            let start = std::time::Instant::now();
            let result = self.inner.classify(tier, prompt).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(outcome) => tracing::info!(
                    elapsed_ms,
                    status = ?outcome.response.status,
                    cost_usd = outcome.usage.cost_usd,
                    "classified"
                ),
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "classify failed"),
            }
            result
        }
        .instrument(tracing::info_span!("safety.classify", tier = ?tier))
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
