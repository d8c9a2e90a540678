//! `ouro evolve on|off` toggles the supervisor's self-modification mode,
//! observable afterward through `ouro status`.

use crate::prelude::*;

#[test]
fn evolve_on_then_off_is_reflected_in_status() {
    let project = Project::empty();
    project.ouro().args(&["daemon", "start"]).passes();
    assert!(project.wait_until_daemon_up());
    project.register_owner();

    project.ouro().args(&["evolve", "on"]).passes().stdout_has("queued: /evolve on");

    assert!(wait_for(SPEC_WAIT_MAX_MS, || {
        project
            .ouro()
            .args(&["status"])
            .passes()
            .stdout()
            .contains("mode: on")
    }));

    project.ouro().args(&["evolve", "off"]).passes().stdout_has("queued: /evolve off");

    assert!(wait_for(SPEC_WAIT_MAX_MS, || {
        project
            .ouro()
            .args(&["status"])
            .passes()
            .stdout()
            .contains("mode: off")
    }));
}

#[test]
fn json_output_reports_evolution_mode_enabled_field() {
    let project = Project::empty();
    project.ouro().args(&["daemon", "start"]).passes();
    assert!(project.wait_until_daemon_up());
    project.register_owner();

    project.ouro().args(&["evolve", "on"]).passes();

    assert!(wait_for(SPEC_WAIT_MAX_MS, || {
        project
            .ouro()
            .args(&["status", "-o", "json"])
            .passes()
            .stdout()
            .contains("\"evolution_mode_enabled\": true")
    }));
}
