//! CLI error handling specs.
//!
//! Verify error messages for invalid commands and arguments that are
//! rejected before ever reaching the daemon.

use crate::prelude::*;

#[test]
fn evolve_rejects_unknown_state() {
    cli()
        .args(&["evolve", "sideways"])
        .fails()
        .stderr_has("expected \"on\" or \"off\"");
}

#[test]
fn chat_rejects_empty_text() {
    cli().args(&["chat"]).fails().stderr_has("must not be empty");
}

#[test]
fn unknown_top_level_subcommand_is_rejected_by_clap() {
    cli().args(&["frobnicate"]).fails();
}

#[test]
fn evolve_missing_state_argument_fails() {
    cli().args(&["evolve"]).fails();
}
