//! Daemon process lifecycle specs: start, stop, restart, and status
//! reporting when no daemon is running.

use crate::prelude::*;

#[test]
fn status_reports_not_running_before_any_daemon_starts() {
    let project = Project::empty();
    project
        .ouro()
        .args(&["status"])
        .passes()
        .stdout_has("not running");
}

#[test]
fn start_then_status_reports_running_with_defaults() {
    let project = Project::empty();
    project.ouro().args(&["daemon", "start"]).passes().stdout_has("Daemon started");

    assert!(
        project.wait_until_daemon_up(),
        "daemon did not come up in time\n{}",
        project.daemon_log()
    );

    project
        .ouro()
        .args(&["status"])
        .passes()
        .stdout_has("running")
        .stdout_has("0 pending, 0 running")
        .stdout_has("$0.00 / $10.00 spent")
        .stdout_has("Evolution:")
        .stdout_has("mode: off");
}

#[test]
fn starting_twice_reports_already_running() {
    let project = Project::empty();
    project.ouro().args(&["daemon", "start"]).passes();
    assert!(project.wait_until_daemon_up());

    project
        .ouro()
        .args(&["daemon", "start"])
        .passes()
        .stdout_has("already running");
}

#[test]
fn stop_shuts_down_the_daemon_and_status_goes_back_to_not_running() {
    let project = Project::empty();
    project.ouro().args(&["daemon", "start"]).passes();
    assert!(project.wait_until_daemon_up());

    project.ouro().args(&["daemon", "stop"]).passes().stdout_has("Daemon stopped");

    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || {
            project
                .ouro()
                .args(&["status"])
                .passes()
                .stdout()
                .contains("not running")
        }),
        "daemon socket still answering after stop"
    );
}

#[test]
fn stopping_when_not_running_is_a_no_op() {
    let project = Project::empty();
    project
        .ouro()
        .args(&["daemon", "stop"])
        .passes()
        .stdout_has("not running");
}

#[test]
fn restart_brings_up_a_fresh_daemon_with_a_new_pid() {
    let project = Project::empty();
    project.ouro().args(&["daemon", "start"]).passes();
    assert!(project.wait_until_daemon_up());

    let pid_path = project.state_path().join("daemon.pid");
    let first_pid = std::fs::read_to_string(&pid_path).expect("pid file");

    project.ouro().args(&["daemon", "restart"]).passes().stdout_has("Daemon restarted");
    assert!(project.wait_until_daemon_up());

    let second_pid = wait_for(SPEC_WAIT_MAX_MS, || {
        std::fs::read_to_string(&pid_path)
            .map(|p| p != first_pid)
            .unwrap_or(false)
    });
    assert!(second_pid, "expected a new pid after restart");
}

#[test]
fn hello_reports_a_version_string() {
    let project = Project::empty();
    project.ouro().args(&["daemon", "start"]).passes();
    assert!(project.wait_until_daemon_up());

    project
        .ouro()
        .args(&["daemon", "--version"])
        .passes()
        .stdout_has("ouroborosd");
}
