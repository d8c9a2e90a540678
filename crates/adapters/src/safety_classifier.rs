// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LLM client behind the two-tier safety gate. Each tier
//! submits the static safety policy document plus the proposed tool call
//! and expects back a structured `{status: "SAFE"|"DANGEROUS", reason}`
//! decision.

use async_trait::async_trait;
use ouro_core::UsageRecord;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierTier {
    /// Cheap model, tried first on every mutating tool call.
    Fast,
    /// Expensive model, consulted only when the fast tier fails to parse
    /// or errors out.
    Deep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Safe,
    Dangerous,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierResponse {
    pub status: Verdict,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClassifierOutcome {
    pub response: ClassifierResponse,
    pub usage: UsageRecord,
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("response could not be parsed as a safety decision")]
    Unparseable,
}

/// Client for one classifier tier. Implementations submit `prompt`
/// (policy + tool call, with a "think carefully" suffix at the deep tier)
/// to their configured model and parse the structured decision.
#[async_trait]
pub trait SafetyClassifier: Send + Sync + 'static {
    async fn classify(
        &self,
        tier: ClassifierTier,
        prompt: &str,
    ) -> Result<ClassifierOutcome, ClassifierError>;
}

/// Production classifier: calls a configured HTTP completion endpoint per
/// tier (model id resolved from daemon config) and parses the first JSON
/// object found in the reply as a [`ClassifierResponse`].
pub struct LlmSafetyClassifier {
    client: reqwest::Client,
    fast_endpoint: String,
    deep_endpoint: String,
}

impl LlmSafetyClassifier {
    pub fn new(fast_endpoint: impl Into<String>, deep_endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            fast_endpoint: fast_endpoint.into(),
            deep_endpoint: deep_endpoint.into(),
        }
    }

    fn endpoint(&self, tier: ClassifierTier) -> &str {
        match tier {
            ClassifierTier::Fast => &self.fast_endpoint,
            ClassifierTier::Deep => &self.deep_endpoint,
        }
    }
}

#[derive(serde::Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct CompletionReply {
    text: String,
    prompt_tokens: u64,
    completion_tokens: u64,
    cost_usd: f64,
}

#[async_trait]
impl SafetyClassifier for LlmSafetyClassifier {
    async fn classify(
        &self,
        tier: ClassifierTier,
        prompt: &str,
    ) -> Result<ClassifierOutcome, ClassifierError> {
        let reply: CompletionReply = self
            .client
            .post(self.endpoint(tier))
            .json(&CompletionRequest { prompt })
            .send()
            .await
            .map_err(|e| ClassifierError::Request(e.to_string()))?
            .json()
            .await
            .map_err(|e| ClassifierError::Request(e.to_string()))?;

        let response: ClassifierResponse =
            serde_json::from_str(reply.text.trim()).map_err(|_| ClassifierError::Unparseable)?;

        Ok(ClassifierOutcome {
            response,
            usage: UsageRecord {
                prompt_tokens: reply.prompt_tokens,
                completion_tokens: reply.completion_tokens,
                cost_usd: reply.cost_usd,
            },
        })
    }
}

/// Scripted fake for tests: returns a fixed verdict per tier, or an error
/// to exercise the fast→deep escalation path.
#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;

    pub enum Scripted {
        Verdict(Verdict),
        Error,
    }

    #[derive(Default)]
    pub struct FakeSafetyClassifier {
        fast: Mutex<Option<Scripted>>,
        deep: Mutex<Option<Scripted>>,
        pub calls: Mutex<Vec<ClassifierTier>>,
    }

    impl FakeSafetyClassifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_fast(self, outcome: Scripted) -> Self {
            *self.fast.lock() = Some(outcome);
            self
        }

        pub fn with_deep(self, outcome: Scripted) -> Self {
            *self.deep.lock() = Some(outcome);
            self
        }
    }

    #[async_trait]
    impl SafetyClassifier for FakeSafetyClassifier {
        async fn classify(
            &self,
            tier: ClassifierTier,
            _prompt: &str,
        ) -> Result<ClassifierOutcome, ClassifierError> {
            self.calls.lock().push(tier);
            let slot = match tier {
                ClassifierTier::Fast => &self.fast,
                ClassifierTier::Deep => &self.deep,
            };
            match slot.lock().as_ref() {
                Some(Scripted::Verdict(v)) => Ok(ClassifierOutcome {
                    response: ClassifierResponse {
                        status: *v,
                        reason: Some("scripted".into()),
                    },
                    usage: UsageRecord {
                        prompt_tokens: 10,
                        completion_tokens: 5,
                        cost_usd: 0.001,
                    },
                }),
                Some(Scripted::Error) | None => Err(ClassifierError::Unparseable),
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSafetyClassifier, Scripted};
