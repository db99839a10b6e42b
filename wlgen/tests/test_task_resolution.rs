use std::collections::BTreeSet;

use wlgen::controller::ExecutionController;
use wlgen::domain::{ConfigError, Pid, WorkloadError};
use wlgen::target::mock::{Journal, MockTarget};
use wlgen::tasks::ProcessTable;
use wlgen::workload::WorkloadDefinition;

fn pids(values: &[u32]) -> BTreeSet<Pid> {
    values.iter().copied().map(Pid).collect()
}

fn profile_controller() -> ExecutionController<MockTarget> {
    let mut ctl = ExecutionController::new(MockTarget::new(Journal::new()));
    ctl.configure(WorkloadDefinition {
        kind: "profile".to_string(),
        params: serde_json::json!({ "t": { "kind": "Periodic" }, "u": {} }),
        command: Some("rt-app wl.json".to_string()),
        ..WorkloadDefinition::default()
    })
    .unwrap();
    ctl
}

#[test]
fn test_latest_snapshot_replaces_task_pids() {
    let mut ctl = profile_controller();

    let first = ProcessTable::from_ps_output(
        "\
USER     PID   PPID  NAME
root     10    1     t
root     11    1     t
root     20    1     other
",
    )
    .unwrap();
    let tasks = ctl.resolve_tasks(Some(&first), None).unwrap();
    assert_eq!(tasks["t"], pids(&[10, 11]));
    assert!(tasks["u"].is_empty());

    let second = ProcessTable::from_ps_output("USER PID PPID NAME\nroot 12 1 t\n").unwrap();
    let tasks = ctl.resolve_tasks(Some(&second), None).unwrap();
    assert_eq!(tasks["t"], pids(&[12]));
}

#[test]
fn test_resolution_is_idempotent() {
    let mut ctl = profile_controller();
    let mut table = ProcessTable::new(["comm", "pid"]);
    table.push_row(["t", "10"]);
    table.push_row(["u", "30"]);
    table.push_row(["u", "31"]);

    let once = ctl.resolve_tasks(Some(&table), None).unwrap().clone();
    let twice = ctl.resolve_tasks(Some(&table), None).unwrap().clone();
    assert_eq!(once, twice);
    assert_eq!(twice["u"], pids(&[30, 31]));
}

#[test]
fn test_snapshot_miss_keeps_previous_pids() {
    let mut ctl = profile_controller();
    let mut table = ProcessTable::new(["comm", "pid"]);
    table.push_row(["t", "10"]);
    ctl.resolve_tasks(Some(&table), Some(&["t"])).unwrap();

    let empty = ProcessTable::new(["comm", "pid"]);
    let tasks = ctl.resolve_tasks(Some(&empty), Some(&["t"])).unwrap();
    assert_eq!(tasks["t"], pids(&[10]));

    // without a snapshot, resolution only reads the table
    assert_eq!(ctl.resolve_tasks(None, None).unwrap()["t"], pids(&[10]));
}

#[test]
fn test_snapshot_without_pid_column() {
    let mut ctl = profile_controller();
    let table = ProcessTable::new(["comm"]);
    let err = ctl.resolve_tasks(Some(&table), None).unwrap_err();
    assert!(matches!(err, WorkloadError::Config(ConfigError::MissingColumn(ref c)) if c == "pid"));
}
