// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: the worker process protocol, the chat
//! transport, the safety classifier client, subprocess helpers used by the
//! restart coordinator, and the shared wire framing they all build on.

pub mod chat_transport;
pub mod safety_classifier;
pub mod subprocess;
pub mod traced;
pub mod wire;
pub mod worker_process;

pub use chat_transport::{
    ChatTransport, ChatTransportError, ChatUpdate, LocalChatTransport, RemoteChatTransport,
};
pub use safety_classifier::{
    ClassifierError, ClassifierOutcome, ClassifierResponse, ClassifierTier, LlmSafetyClassifier,
    SafetyClassifier, Verdict,
};
pub use subprocess::{run_with_timeout, GIT_TIMEOUT, WORKER_GRACEFUL_TIMEOUT};
pub use traced::{TracedChatTransport, TracedSafetyClassifier, TracedWorkerProcess};
pub use wire::{WireError, MAX_MESSAGE_SIZE};
pub use worker_process::{SubprocessWorkerAdapter, WorkerProcessAdapter, WorkerProcessError};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use chat_transport::FakeChatTransport;
#[cfg(any(test, feature = "test-support"))]
pub use safety_classifier::{FakeSafetyClassifier, Scripted};
#[cfg(any(test, feature = "test-support"))]
pub use worker_process::{FakeWorkerProcessAdapter, WorkerCall};
