//! CLI help output specs.
//!
//! Verify help text displays for the operator client's subcommands.

use crate::prelude::*;

#[test]
fn ouro_no_args_shows_usage_and_exits_zero() {
    cli().passes().stdout_has("Usage:");
}

#[test]
fn ouro_help_shows_usage_and_actions() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("Usage:")
        .stdout_has("status")
        .stdout_has("panic")
        .stdout_has("restart")
        .stdout_has("evolve")
        .stdout_has("chat")
        .stdout_has("daemon");
}

#[test]
fn ouro_daemon_help_shows_subcommands() {
    cli()
        .args(&["daemon", "--help"])
        .passes()
        .stdout_has("start")
        .stdout_has("stop")
        .stdout_has("restart");
}

#[test]
fn ouro_status_help_shows_watch_flag() {
    cli()
        .args(&["status", "--help"])
        .passes()
        .stdout_has("--watch");
}

#[test]
fn ouro_version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.1");
}

#[test]
fn ouro_daemon_version_reports_not_running_without_daemon() {
    // No OUROBOROS_STATE_DIR override: prelude strips any inherited one,
    // so this always resolves to an empty (no socket) default.
    cli()
        .env("OUROBOROS_STATE_DIR", std::env::temp_dir().join("ouro-spec-no-such-daemon"))
        .args(&["daemon", "--version"])
        .passes()
        .stdout_has("not running");
}
