//! First-contact-wins owner registration over the CLI's `chat` command,
//! which speaks the same `Request::Chat` the remote messenger gateway
//! uses.
//!
//! The CLI only confirms the message was queued (`queued: ...`); it does
//! not wait for the chat router's reply. Status is how we observe the
//! router actually ran.

use crate::prelude::*;

#[test]
fn first_message_registers_owner_and_does_not_run_as_a_command() {
    let project = Project::empty();
    project.ouro().args(&["daemon", "start"]).passes();
    assert!(project.wait_until_daemon_up());

    project
        .ouro()
        .args(&["status"])
        .passes()
        .stdout_has("owner registered: no");

    project.ouro().args(&["chat", "hi"]).passes().stdout_has("queued: hi");

    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || {
            project
                .ouro()
                .args(&["status"])
                .passes()
                .stdout()
                .contains("owner registered: yes")
        }),
        "owner was never registered\n{}",
        project.daemon_log()
    );

    // "hi" isn't a recognized command and wasn't queued as an ad-hoc
    // task either — the registration consumed it.
    project
        .ouro()
        .args(&["status"])
        .passes()
        .stdout_has("0 pending, 0 running");
}

#[test]
fn second_chat_id_is_ignored_once_an_owner_exists() {
    let project = Project::empty();
    project.ouro().args(&["daemon", "start"]).passes();
    assert!(project.wait_until_daemon_up());
    project.register_owner();

    // The CLI always speaks as the fixed `cli-local` chat id, so there's
    // no second-sender surface to drive from this binary; the
    // ignore-the-rest half of first-contact-wins is covered at the unit
    // level in `chat_router_tests.rs::non_owner_message_is_ignored`.
    project
        .ouro()
        .args(&["status"])
        .passes()
        .stdout_has("owner registered: yes");
}
