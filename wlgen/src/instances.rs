//! Listing and killing running instances of a workload executor.

use log::info;

use crate::domain::{Pid, TargetError};
use crate::target::Target;

/// A running executor process, as reported by the target's `ps`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub pid: Pid,
    pub name: String,
    pub user: String,
}

/// Fields in a toolbox `ps` row: USER PID PPID VSIZE RSS WCHAN PC S NAME
const PS_FIELDS: usize = 9;

/// Find the instances of `executor` running on the target, optionally
/// sending each one `SIGKILL`.
///
/// # Errors
/// Fails if `ps` or `kill` fail on the target. A `grep` without matches is
/// reported as an empty list.
pub fn list_instances(
    target: &dyn Target,
    executor: &str,
    kill: bool,
) -> Result<Vec<Instance>, TargetError> {
    let output = match target.execute(&format!("ps | grep {executor}"), false, None) {
        Ok(output) => output,
        // grep exits with 1 when nothing matched
        Err(TargetError::CommandFailed { code: 1, .. }) => String::new(),
        Err(e) => return Err(e),
    };

    let instances: Vec<Instance> = output.lines().filter_map(parse_ps_row).collect();

    for instance in &instances {
        info!("{:>5}: {} ({})", instance.pid.0, instance.name, instance.user);
        if kill {
            target.execute(&format!("kill -9 {}", instance.pid.0), false, None)?;
        }
    }

    Ok(instances)
}

/// Kill every running instance of `executor`.
///
/// # Errors
/// See [`list_instances`]
pub fn kill_all(target: &dyn Target, executor: &str) -> Result<Vec<Instance>, TargetError> {
    info!("Killing all [{executor}] instances:");
    list_instances(target, executor, true)
}

fn parse_ps_row(line: &str) -> Option<Instance> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < PS_FIELDS {
        return None;
    }
    let name = fields[PS_FIELDS - 1..].join(" ");
    // The grep itself shows up in its own listing
    if name.starts_with("grep") {
        return None;
    }
    let pid = fields[1].parse().ok()?;
    Some(Instance { pid: Pid(pid), name, user: fields[0].to_string() })
}
