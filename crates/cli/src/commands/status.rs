// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ouro status` — daemon status dashboard.

use std::fmt::Write;
use std::io::IsTerminal;

use anyhow::Result;

use ouro_daemon::StatusReport;

use crate::client::DaemonClient;
use crate::color;
use crate::output::OutputFormat;

/// ANSI sequence: move cursor to top-left (home position).
/// Used instead of \x1B[2J (clear screen) to avoid pushing old content
/// into terminal scrollback.
const CURSOR_HOME: &str = "\x1B[H";

/// ANSI sequence: clear from cursor position to end of screen.
/// Removes leftover lines from a previous (longer) render.
const CLEAR_TO_END: &str = "\x1B[J";

/// ANSI sequence: clear from cursor position to end of line.
/// Removes leftover characters from a previous (wider) render on the same line.
const CLEAR_TO_EOL: &str = "\x1B[K";

#[derive(clap::Args)]
pub struct StatusArgs {
    /// Re-run status display in a loop (Ctrl+C to exit)
    #[arg(long)]
    pub watch: bool,

    /// Refresh interval for --watch mode (e.g. 2s, 10s)
    #[arg(long, default_value = "5s")]
    pub interval: String,
}

pub async fn handle(args: StatusArgs, format: OutputFormat) -> Result<()> {
    if !args.watch {
        return handle_once(format, None).await;
    }

    let interval = parse_duration(&args.interval)?;
    if interval.is_zero() {
        anyhow::bail!("duration must be > 0");
    }

    let is_tty = std::io::stdout().is_terminal();

    loop {
        handle_watch_frame(format, &args.interval, is_tty).await?;
        {
            use std::io::Write as _;
            std::io::stdout().flush()?;
        }
        tokio::time::sleep(interval).await;
    }
}

fn parse_duration(spec: &str) -> Result<std::time::Duration> {
    let spec = spec.trim();
    let (number, unit) = spec
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .map(|idx| (&spec[..idx], &spec[idx..]))
        .unwrap_or((spec, "s"));
    let value: f64 = number
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid duration: {}", spec))?;
    let secs = match unit {
        "s" | "" => value,
        "m" => value * 60.0,
        "h" => value * 3600.0,
        other => anyhow::bail!("unknown duration unit: {}", other),
    };
    Ok(std::time::Duration::from_secs_f64(secs))
}

async fn handle_watch_frame(format: OutputFormat, interval: &str, is_tty: bool) -> Result<()> {
    let content = fetch_and_format(format, Some(interval)).await?;
    print!("{}", render_frame(&content, is_tty));
    Ok(())
}

/// Build one watch-mode frame.
///
/// When `is_tty` is true the frame is wrapped with ANSI cursor-home
/// before and clear-to-end after, so the terminal redraws in place
/// without polluting scrollback.  Each line also gets a clear-to-EOL
/// sequence so that a shorter line does not leave remnants from the
/// previous (wider) frame.  When false the content is returned as-is
/// (suitable for piped / redirected output).
fn render_frame(content: &str, is_tty: bool) -> String {
    if is_tty {
        let cleared = content.replace('\n', &format!("{CLEAR_TO_EOL}\n"));
        format!("{CURSOR_HOME}{cleared}{CLEAR_TO_END}")
    } else {
        content.to_string()
    }
}

fn format_not_running(format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("{} not running\n", color::header("ouroborosd:")),
        OutputFormat::Json => r#"{ "status": "not_running" }"#.to_string() + "\n",
    }
}

async fn handle_once(format: OutputFormat, watch_interval: Option<&str>) -> Result<()> {
    let content = fetch_and_format(format, watch_interval).await?;
    print!("{}", content);
    Ok(())
}

async fn fetch_and_format(format: OutputFormat, watch_interval: Option<&str>) -> Result<String> {
    let client = match DaemonClient::connect() {
        Ok(c) => c,
        Err(_) => return Ok(format_not_running(format)),
    };

    let report = match client.status().await {
        Ok(report) => report,
        Err(crate::client::ClientError::DaemonNotRunning) => {
            return Ok(format_not_running(format));
        }
        Err(crate::client::ClientError::Io(ref e))
            if matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotFound
            ) =>
        {
            return Ok(format_not_running(format));
        }
        Err(e) => return Err(e.into()),
    };

    Ok(match format {
        OutputFormat::Text => format_text(&report, watch_interval),
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(&report)?),
    })
}

fn format_text(report: &StatusReport, watch_interval: Option<&str>) -> String {
    let mut out = String::new();

    let uptime = format_duration(report.uptime_secs);
    let _ = write!(
        out,
        "{} {} {}",
        color::header("ouroborosd:"),
        color::status("running"),
        uptime
    );
    if let Some(interval) = watch_interval {
        let _ = write!(out, " | every {}", interval);
    }
    out.push('\n');

    let _ = writeln!(out);
    let _ = writeln!(out, "  {}", color::header("Queue:"));
    let _ = writeln!(
        out,
        "    {} pending, {} running (max {} worker{})",
        report.pending_tasks,
        report.running_tasks,
        report.max_workers,
        if report.max_workers == 1 { "" } else { "s" }
    );
    let _ = writeln!(
        out,
        "    {}/{} workers active",
        report.workers_active, report.max_workers
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "  {}", color::header("Budget:"));
    let budget_status = if report.budget_exhausted {
        color::status("exhausted")
    } else {
        color::status("ok")
    };
    let _ = writeln!(
        out,
        "    ${:.2} / ${:.2} spent ({})",
        report.spent_usd, report.budget_limit_usd, budget_status
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "  {}", color::header("Evolution:"));
    let _ = writeln!(
        out,
        "    mode: {}",
        color::status(if report.evolution_mode_enabled {
            "on"
        } else {
            "off"
        })
    );
    let _ = writeln!(
        out,
        "    self-review: {}",
        color::status(if report.consciousness_running {
            "running"
        } else {
            "idle"
        })
    );
    let _ = writeln!(
        out,
        "    owner registered: {}",
        if report.owner_registered { "yes" } else { "no" }
    );
    if let Some(ref branch) = report.current_branch {
        let _ = writeln!(out, "    branch: {}", branch);
    }

    out
}

fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    if hours > 0 {
        format!("{}h {}m {}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
