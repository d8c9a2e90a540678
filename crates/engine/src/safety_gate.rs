// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-tier safety gate: fast/cheap classifier escalating to a deep/
//! expensive one on parse failure or transport error.

use ouro_adapters::{ClassifierError, ClassifierTier, SafetyClassifier, Verdict};
use ouro_core::UsageRecord;
use serde_json::Value;
use std::sync::Arc;

/// Tool names the gate actually classifies. Everything else is allowed
/// without consulting a classifier.
pub const MUTATING_TOOLS: &[&str] = &[
    "run_shell",
    "code_edit",
    "repo_write_commit",
    "repo_commit",
    "drive_write",
];

const GENERIC_DENY_REASON: &str = "safety check failed";

/// Outcome of a gate decision, plus any classifier usage incurred so the
/// caller can report it to the Budget Accountant.
#[derive(Debug, Clone)]
pub struct GateDecision {
    pub allowed: bool,
    pub reason: Option<String>,
    pub usage: Vec<UsageRecord>,
}

impl GateDecision {
    fn allow(usage: Vec<UsageRecord>) -> Self {
        Self {
            allowed: true,
            reason: None,
            usage,
        }
    }

    fn deny(reason: String, usage: Vec<UsageRecord>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            usage,
        }
    }
}

/// The static policy document the gate sends to both classifier tiers,
/// prepended to every prompt.
pub struct SafetyGate {
    classifier: Arc<dyn SafetyClassifier>,
    policy: String,
}

impl SafetyGate {
    pub fn new(classifier: Arc<dyn SafetyClassifier>, policy: impl Into<String>) -> Self {
        Self {
            classifier,
            policy: policy.into(),
        }
    }

    /// Decide whether `tool` with `args` may run. Tools outside
    /// [`MUTATING_TOOLS`] are always allowed without a classifier call.
    pub async fn check(&self, tool: &str, args: &Value) -> GateDecision {
        if !MUTATING_TOOLS.contains(&tool) {
            return GateDecision::allow(Vec::new());
        }

        let prompt = format!(
            "{policy}\n\nProposed tool call:\ntool: {tool}\nargs: {args}",
            policy = self.policy
        );

        let mut usage = Vec::new();

        match self.classifier.classify(ClassifierTier::Fast, &prompt).await {
            Ok(outcome) => {
                usage.push(outcome.usage);
                if outcome.response.status == Verdict::Safe {
                    return GateDecision::allow(usage);
                }
                // Fast tier flagged it dangerous, or failed to parse: either
                // way only the deep tier gets to deny. The cheap tier
                // hallucinating `DANGEROUS` on a benign call is exactly the
                // case escalation exists to catch.
            }
            Err(ClassifierError::Unparseable) | Err(ClassifierError::Request(_)) => {}
        }

        let deep_prompt = format!("{prompt}\n\nThink carefully before answering.");
        match self.classifier.classify(ClassifierTier::Deep, &deep_prompt).await {
            Ok(outcome) => {
                usage.push(outcome.usage);
                match outcome.response.status {
                    Verdict::Safe => GateDecision::allow(usage),
                    Verdict::Dangerous => GateDecision::deny(
                        outcome
                            .response
                            .reason
                            .unwrap_or_else(|| GENERIC_DENY_REASON.to_string()),
                        usage,
                    ),
                }
            }
            Err(_) => GateDecision::deny(GENERIC_DENY_REASON.to_string(), usage),
        }
    }
}

#[cfg(test)]
#[path = "safety_gate_tests.rs"]
mod tests;
