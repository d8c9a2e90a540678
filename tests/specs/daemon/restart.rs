//! `/restart` runs the safe-restart protocol inside the running daemon.
//! There is no managed git repository in these
//! tests, so the coordinator's unsynced-commit check fails fast and the
//! restart is abandoned with a warning — the daemon keeps running and
//! the queue is untouched, which is itself worth pinning down: a failed
//! safe-restart must not take the supervisor down with it.
//!
//! `ouro daemon restart` is the separate, CLI-driven process restart
//! (stop then spawn fresh) and is covered in `lifecycle.rs`.

use crate::prelude::*;

#[test]
fn chat_restart_is_queued_and_daemon_survives_a_failed_safe_restart() {
    let project = Project::empty();
    project.ouro().args(&["daemon", "start"]).passes();
    assert!(project.wait_until_daemon_up());
    project.register_owner();

    project
        .ouro()
        .args(&["restart"])
        .passes()
        .stdout_has("queued: /restart");

    // No git repo exists at the default repo_path, so the coordinator's
    // `git rev-list` call fails and safe_restart bails out before ever
    // reaching kill-workers/re-exec. The daemon must still be up.
    std::thread::sleep(std::time::Duration::from_millis(200));
    project
        .ouro()
        .args(&["status"])
        .passes()
        .stdout_has("running");
}
