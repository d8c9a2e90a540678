// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{parse_startup_error, probe_socket, process_exists, STARTUP_MARKER_PREFIX};

#[test]
fn startup_marker_prefix_matches_daemon_constant() {
    assert_eq!(
        STARTUP_MARKER_PREFIX,
        "--- ouroborosd: starting (pid: "
    );
}

#[test]
fn parse_startup_error_finds_error_after_latest_marker() {
    let log = format!(
        "{}1)\nINFO boot\n{}2)\nERROR failed to start daemon: port in use\n",
        STARTUP_MARKER_PREFIX, STARTUP_MARKER_PREFIX
    );
    let err = parse_startup_error(&log).expect("should find an error");
    assert!(err.contains("port in use"));
}

#[test]
fn parse_startup_error_returns_none_when_no_errors() {
    let log = format!("{}1)\nINFO boot\nINFO ready\n", STARTUP_MARKER_PREFIX);
    assert!(parse_startup_error(&log).is_none());
}

#[test]
fn parse_startup_error_returns_none_without_marker() {
    let log = "INFO boot\nERROR nope, no marker present\n".to_string();
    assert!(parse_startup_error(&log).is_none());
}

#[test]
fn probe_socket_fails_for_nonexistent_path() {
    let path = std::path::Path::new("/nonexistent/ouroboros/daemon.sock");
    assert!(!probe_socket(path));
}

#[test]
fn process_exists_is_true_for_self() {
    assert!(process_exists(std::process::id()));
}

#[test]
fn process_exists_is_false_for_unlikely_pid() {
    // PID 1 is almost certainly init/systemd, not us, but it does exist;
    // use an implausibly large PID instead to exercise the "no such process" path.
    assert!(!process_exists(u32::MAX));
}
