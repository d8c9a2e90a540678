// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chat transport: the interface the supervisor consumes to read owner
//! text and send replies, abstracting over the local in-process queue
//! (backs the GUI) and a remote messenger gateway.

use async_trait::async_trait;
use ouro_core::ChatId;
use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum ChatTransportError {
    #[error("transport unavailable: {0}")]
    Unavailable(String),
    #[error("request failed: {0}")]
    Request(String),
}

/// One inbound message, as returned by `fetch_updates`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatUpdate {
    pub update_id: u64,
    pub chat_id: ChatId,
    pub text: String,
}

/// Implementer-agnostic chat transport contract.
#[async_trait]
pub trait ChatTransport: Send + Sync + 'static {
    /// Long-poll for new messages since `offset`, waiting up to `timeout`.
    async fn fetch_updates(
        &self,
        offset: u64,
        timeout: Duration,
    ) -> Result<Vec<ChatUpdate>, ChatTransportError>;

    /// Send a message to `chat_id`.
    async fn send_message(
        &self,
        chat_id: &ChatId,
        text: &str,
        markdown: bool,
    ) -> Result<(), ChatTransportError>;
}

/// Local in-process transport backing the GUI: inbound text is pushed by
/// the UI producer, outbound replies are pulled by the UI for display.
#[derive(Default)]
pub struct LocalChatTransport {
    inbox: Mutex<VecDeque<ChatUpdate>>,
    outbox: Mutex<VecDeque<(ChatId, String, bool)>>,
    next_update_id: std::sync::atomic::AtomicU64,
}

impl LocalChatTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called by the UI producer to push inbound owner text.
    pub async fn push_inbound(&self, chat_id: ChatId, text: String) {
        let update_id = self
            .next_update_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.inbox.lock().await.push_back(ChatUpdate {
            update_id,
            chat_id,
            text,
        });
    }

    /// Called by the UI to drain outbound replies for display.
    pub async fn drain_outbound(&self) -> Vec<(ChatId, String, bool)> {
        self.outbox.lock().await.drain(..).collect()
    }
}

#[async_trait]
impl ChatTransport for LocalChatTransport {
    async fn fetch_updates(
        &self,
        offset: u64,
        _timeout: Duration,
    ) -> Result<Vec<ChatUpdate>, ChatTransportError> {
        let mut inbox = self.inbox.lock().await;
        let ready: Vec<ChatUpdate> = inbox
            .iter()
            .filter(|u| u.update_id >= offset)
            .cloned()
            .collect();
        inbox.retain(|u| u.update_id >= offset);
        Ok(ready)
    }

    async fn send_message(
        &self,
        chat_id: &ChatId,
        text: &str,
        markdown: bool,
    ) -> Result<(), ChatTransportError> {
        self.outbox
            .lock()
            .await
            .push_back((chat_id.clone(), text.to_string(), markdown));
        Ok(())
    }
}

/// Remote messenger gateway transport: long-polls a `getUpdates`-style
/// HTTP endpoint and posts replies, the way a Telegram-bot-style bridge
/// would. The base URL and bot token are supplied by configuration.
pub struct RemoteChatTransport {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteChatTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ChatTransport for RemoteChatTransport {
    async fn fetch_updates(
        &self,
        offset: u64,
        timeout: Duration,
    ) -> Result<Vec<ChatUpdate>, ChatTransportError> {
        #[derive(serde::Deserialize)]
        struct WireUpdate {
            update_id: u64,
            message: WireMessage,
        }
        #[derive(serde::Deserialize)]
        struct WireMessage {
            chat_id: String,
            text: String,
        }

        let url = format!("{}/getUpdates", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("offset", offset.to_string())])
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ChatTransportError::Request(e.to_string()))?;

        let updates: Vec<WireUpdate> = resp
            .json()
            .await
            .map_err(|e| ChatTransportError::Request(e.to_string()))?;

        Ok(updates
            .into_iter()
            .map(|u| ChatUpdate {
                update_id: u.update_id,
                chat_id: ChatId::new(u.message.chat_id),
                text: u.message.text,
            })
            .collect())
    }

    async fn send_message(
        &self,
        chat_id: &ChatId,
        text: &str,
        markdown: bool,
    ) -> Result<(), ChatTransportError> {
        let url = format!("{}/sendMessage", self.base_url);
        #[derive(serde::Serialize)]
        struct SendBody<'a> {
            chat_id: &'a str,
            text: &'a str,
            markdown: bool,
        }
        self.client
            .post(&url)
            .json(&SendBody {
                chat_id: chat_id.as_str(),
                text,
                markdown,
            })
            .send()
            .await
            .map_err(|e| ChatTransportError::Request(e.to_string()))?;
        Ok(())
    }
}

/// In-memory fake for tests.
#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;

    #[derive(Default)]
    pub struct FakeChatTransport {
        pub pending: Mutex<VecDeque<ChatUpdate>>,
        pub sent: Mutex<Vec<(ChatId, String, bool)>>,
    }

    impl FakeChatTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn enqueue(&self, update_id: u64, chat_id: ChatId, text: impl Into<String>) {
            self.pending.lock().await.push_back(ChatUpdate {
                update_id,
                chat_id,
                text: text.into(),
            });
        }
    }

    #[async_trait]
    impl ChatTransport for FakeChatTransport {
        async fn fetch_updates(
            &self,
            offset: u64,
            _timeout: Duration,
        ) -> Result<Vec<ChatUpdate>, ChatTransportError> {
            let mut pending = self.pending.lock().await;
            let ready: Vec<ChatUpdate> =
                pending.iter().filter(|u| u.update_id >= offset).cloned().collect();
            pending.retain(|u| u.update_id >= offset);
            Ok(ready)
        }

        async fn send_message(
            &self,
            chat_id: &ChatId,
            text: &str,
            markdown: bool,
        ) -> Result<(), ChatTransportError> {
            self.sent
                .lock()
                .await
                .push((chat_id.clone(), text.to_string(), markdown));
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeChatTransport;

#[cfg(test)]
#[path = "chat_transport_tests.rs"]
mod tests;
