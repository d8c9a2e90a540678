//! `/panic`: emit a warning, kill every worker, and exit the process
//! immediately with a non-zero code. Unlike `/restart`,
//! nothing re-execs in its place — the operator has to start it again.

use crate::prelude::*;

#[test]
fn panic_is_queued_then_the_daemon_process_exits() {
    let project = Project::empty();
    project.ouro().args(&["daemon", "start"]).passes();
    assert!(project.wait_until_daemon_up());
    project.register_owner();

    let pid_path = project.state_path().join("daemon.pid");
    assert!(pid_path.exists());

    project.ouro().args(&["panic"]).passes().stdout_has("queued: /panic");

    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || {
            project
                .ouro()
                .args(&["status"])
                .passes()
                .stdout()
                .contains("not running")
        }),
        "daemon kept answering status after /panic\n{}",
        project.daemon_log()
    );
}

#[test]
fn first_contact_panic_only_registers_the_owner_and_does_not_trigger_it() {
    let project = Project::empty();
    project.ouro().args(&["daemon", "start"]).passes();
    assert!(project.wait_until_daemon_up());

    // Sent cold, before any owner exists: consumed as the registration
    // message, not parsed as a command (see owner.rs).
    project.ouro().args(&["chat", "/panic"]).passes().stdout_has("queued: /panic");

    // Give the router a beat to process, then confirm the daemon is
    // still very much alive and the owner is now registered.
    std::thread::sleep(std::time::Duration::from_millis(200));
    project
        .ouro()
        .args(&["status"])
        .passes()
        .stdout_has("running")
        .stdout_has("owner registered: yes");
}
