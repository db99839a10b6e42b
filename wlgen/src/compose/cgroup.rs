//! Cgroup placement wrapping

/// Utility function of the target's `shutils` script that moves itself into
/// a cgroup and then executes its argument
const CGROUP_RUN_INTO: &str = "cgroups_run_into";

/// Wraps a command so it is executed inside a named cgroup.
///
/// The group is not validated here; a missing cgroup surfaces as an
/// execution error from the target.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResourceGroupComposer {
    group: Option<String>,
}

impl ResourceGroupComposer {
    pub fn new(group: Option<String>) -> Self {
        Self { group }
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// `cgroups_run_into <group> '<command>'`, or `command` unchanged when
    /// no group is configured.
    #[must_use]
    pub fn wrap(&self, command: &str) -> String {
        match &self.group {
            Some(group) => format!("{CGROUP_RUN_INTO} {group} {}", single_quote(command)),
            None => command.to_string(),
        }
    }
}

/// Quote `s` for a POSIX shell, escaping embedded single quotes
fn single_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
