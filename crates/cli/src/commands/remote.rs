// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin wrappers around the daemon's chat command router.
//!
//! `panic`, `restart`, `evolve`, and `chat` all funnel through
//! `Request::Chat`, the same entry point the owner's remote chat
//! transport uses. The daemon appends the text as a `ChatIn` event and
//! replies immediately — it does not wait for the router to process it,
//! so these commands only confirm the message was queued, not that it
//! was acted on.

use anyhow::{anyhow, Result};
use clap::Args;

use crate::client::DaemonClient;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct EvolveArgs {
    /// "on" or "off"
    pub state: String,
}

async fn send_chat(text: &str) -> Result<()> {
    let client = DaemonClient::connect().map_err(|e| anyhow!("{}", e))?;
    client.chat(text).await.map_err(|e| anyhow!("{}", e))?;
    println!("queued: {}", text);
    Ok(())
}

pub async fn panic(_format: OutputFormat) -> Result<()> {
    send_chat("/panic").await
}

pub async fn restart(_format: OutputFormat) -> Result<()> {
    send_chat("/restart").await
}

pub async fn evolve(args: EvolveArgs, _format: OutputFormat) -> Result<()> {
    match args.state.as_str() {
        "on" | "off" => send_chat(&format!("/evolve {}", args.state)).await,
        other => Err(anyhow!("expected \"on\" or \"off\", got \"{}\"", other)),
    }
}

pub async fn chat(text: Vec<String>, _format: OutputFormat) -> Result<()> {
    let text = text.join(" ");
    if text.is_empty() {
        return Err(anyhow!("chat text must not be empty"));
    }
    send_chat(&text).await
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
