// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ouro daemon` - Daemon process management commands

use crate::client::{ClientError, DaemonClient};
use crate::client_lifecycle::daemon_stop;
use crate::daemon_process::start_daemon_background;
use crate::output::OutputFormat;
use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct DaemonArgs {
    /// Print daemon version
    #[arg(short = 'v', long = "version")]
    pub version: bool,

    #[command(subcommand)]
    pub command: Option<DaemonCommand>,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon (foreground or background)
    Start {
        /// Run in foreground (useful for debugging)
        #[arg(long)]
        foreground: bool,
    },
    /// Stop the daemon
    Stop {
        /// Kill all in-flight worker processes before stopping
        #[arg(long)]
        kill: bool,
    },
    /// Stop and restart the daemon
    Restart {
        /// Kill all in-flight worker processes before restarting
        #[arg(long)]
        kill: bool,
    },
}

pub async fn daemon(args: DaemonArgs, format: OutputFormat) -> Result<()> {
    if args.version {
        return version(format).await;
    }

    match args.command {
        Some(DaemonCommand::Start { foreground }) => start(foreground).await,
        Some(DaemonCommand::Stop { kill }) => stop(kill).await,
        Some(DaemonCommand::Restart { kill }) => restart(kill).await,
        None => {
            let cmd = crate::find_subcommand(crate::cli_command(), &["daemon"]);
            crate::help::print_help(cmd);
            Ok(())
        }
    }
}

fn not_running(format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("Daemon not running"),
        OutputFormat::Json => println!(r#"{{ "status": "not_running" }}"#),
    }
    Ok(())
}

fn is_connection_refused(err: &ClientError) -> bool {
    matches!(err, ClientError::DaemonNotRunning)
        || matches!(
            err,
            ClientError::Io(e) if matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotFound
            )
        )
}

async fn version(format: OutputFormat) -> Result<()> {
    let client = match DaemonClient::connect() {
        Ok(c) => c,
        Err(_) => return not_running(format),
    };

    let version = match client.hello().await {
        Ok(v) => v,
        Err(ref e) if is_connection_refused(e) => return not_running(format),
        Err(_) => "unknown".to_string(),
    };

    match format {
        OutputFormat::Text => println!("ouroborosd {}", version),
        OutputFormat::Json => {
            let obj = serde_json::json!({ "version": version });
            println!("{}", serde_json::to_string_pretty(&obj)?);
        }
    }

    Ok(())
}

async fn start(foreground: bool) -> Result<()> {
    if foreground {
        let daemon_path = crate::daemon_process::find_ouroborosd_binary().map_err(|e| anyhow!("{}", e))?;
        let status = std::process::Command::new(&daemon_path).status()?;
        if !status.success() {
            return Err(anyhow!("Daemon exited with status: {}", status));
        }
        return Ok(());
    }

    if let Ok(client) = DaemonClient::connect() {
        if let Ok(report) = client.status().await {
            println!("Daemon already running (uptime: {}s)", report.uptime_secs);
            return Ok(());
        }
    }

    match start_daemon_background() {
        Ok(_child) => {
            println!("Daemon started");
            Ok(())
        }
        Err(e) => Err(anyhow!("{}", e)),
    }
}

async fn stop(kill: bool) -> Result<()> {
    match daemon_stop(kill).await {
        Ok(true) => {
            println!("Daemon stopped");
            Ok(())
        }
        Ok(false) => {
            println!("Daemon not running");
            Ok(())
        }
        Err(e) => Err(anyhow!("Failed to stop daemon: {}", e)),
    }
}

async fn restart(kill: bool) -> Result<()> {
    let was_running = daemon_stop(kill)
        .await
        .map_err(|e| anyhow!("Failed to stop daemon: {}", e))?;

    if was_running {
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    }

    match start_daemon_background() {
        Ok(_child) => {
            println!("Daemon restarted");
            Ok(())
        }
        Err(e) => Err(anyhow!("{}", e)),
    }
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
