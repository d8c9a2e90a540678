use ouro_daemon::StatusReport;

use super::{format_duration, format_text};

fn report(uptime_secs: u64) -> StatusReport {
    StatusReport {
        uptime_secs,
        pending_tasks: 0,
        running_tasks: 0,
        max_workers: 4,
        workers_active: 0,
        spent_usd: 0.0,
        budget_limit_usd: 10.0,
        budget_exhausted: false,
        evolution_mode_enabled: false,
        consciousness_running: false,
        owner_registered: false,
        current_branch: None,
    }
}

#[test]
fn header_without_watch_interval() {
    let out = format_text(&report(120), None);
    let first_line = out.lines().next().unwrap();
    assert_eq!(first_line, "ouroborosd: running 2m 0s");
}

#[test]
fn header_with_watch_interval() {
    let out = format_text(&report(120), Some("5s"));
    let first_line = out.lines().next().unwrap();
    assert_eq!(first_line, "ouroborosd: running 2m 0s | every 5s");
}

#[test]
fn header_with_custom_watch_interval() {
    let out = format_text(&report(3700), Some("10s"));
    let first_line = out.lines().next().unwrap();
    assert_eq!(first_line, "ouroborosd: running 1h 1m 40s | every 10s");
}

#[test]
fn body_includes_queue_worker_and_budget_sections() {
    let mut r = report(60);
    r.pending_tasks = 3;
    r.running_tasks = 2;
    r.workers_active = 2;
    r.spent_usd = 1.5;
    r.budget_limit_usd = 5.0;
    let out = format_text(&r, None);
    assert!(out.contains("3 pending, 2 running"));
    assert!(out.contains("2/4 workers active"));
    assert!(out.contains("$1.50 / $5.00 spent"));
}

#[test]
fn budget_exhausted_is_flagged() {
    let mut r = report(60);
    r.budget_exhausted = true;
    let out = format_text(&r, None);
    assert!(out.contains("exhausted"));
}

#[test]
fn evolution_section_reflects_flags() {
    let mut r = report(60);
    r.evolution_mode_enabled = true;
    r.consciousness_running = true;
    r.owner_registered = true;
    r.current_branch = Some("main".to_string());
    let out = format_text(&r, None);
    assert!(out.contains("mode: on"));
    assert!(out.contains("self-review: running"));
    assert!(out.contains("owner registered: yes"));
    assert!(out.contains("branch: main"));
}

#[test]
fn format_duration_values() {
    assert_eq!(format_duration(0), "0s");
    assert_eq!(format_duration(59), "59s");
    assert_eq!(format_duration(60), "1m 0s");
    assert_eq!(format_duration(3599), "59m 59s");
    assert_eq!(format_duration(3600), "1h 0m 0s");
    assert_eq!(format_duration(3660), "1h 1m 0s");
    assert_eq!(format_duration(86400), "24h 0m 0s");
}
