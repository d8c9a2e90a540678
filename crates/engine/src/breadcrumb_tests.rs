use super::*;
use ouro_core::{TaskId, TaskKind};
use std::collections::HashMap;
use tempfile::tempdir;

fn make_task(id: &str, worker: &str) -> Task {
    let mut task = Task::new(TaskId::new(id), TaskKind::Adhoc, 0, String::new(), 0);
    task.assign(WorkerId::new(worker), 100);
    task
}

#[test]
fn write_then_scan_round_trips() {
    let dir = tempdir().unwrap();
    let writer = BreadcrumbWriter::new(dir.path().to_path_buf());
    let task = make_task("t1", "w1");

    writer.write(&task);

    let found = scan(dir.path());
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].task_id, TaskId::new("t1"));
    assert_eq!(found[0].worker_id, WorkerId::new("w1"));
}

#[test]
fn write_without_assignment_is_a_no_op() {
    let dir = tempdir().unwrap();
    let writer = BreadcrumbWriter::new(dir.path().to_path_buf());
    let task = Task::new(TaskId::new("t1"), TaskKind::Adhoc, 0, String::new(), 0);

    writer.write(&task);

    assert!(scan(dir.path()).is_empty());
}

#[test]
fn delete_removes_the_file() {
    let dir = tempdir().unwrap();
    let writer = BreadcrumbWriter::new(dir.path().to_path_buf());
    let task = make_task("t1", "w1");
    writer.write(&task);

    writer.delete(&task.id);

    assert!(scan(dir.path()).is_empty());
}

#[test]
fn scan_skips_corrupt_files() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("bad.crumb.json"), b"not json").unwrap();
    let writer = BreadcrumbWriter::new(dir.path().to_path_buf());
    writer.write(&make_task("t1", "w1"));

    let found = scan(dir.path());
    assert_eq!(found.len(), 1);
}

#[test]
fn orphans_not_in_running_set_flags_unmatched_breadcrumbs() {
    let dir = tempdir().unwrap();
    let writer = BreadcrumbWriter::new(dir.path().to_path_buf());
    writer.write(&make_task("t1", "w1"));
    writer.write(&make_task("t2", "w2"));

    let breadcrumbs = scan(dir.path());
    let mut running = HashMap::new();
    running.insert(TaskId::new("t1"), make_task("t1", "w1"));

    let orphans = orphans_not_in_running_set(&breadcrumbs, &running);
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].task_id, TaskId::new("t2"));
}
