//! Final command assembly

use log::debug;
use std::fmt;
use std::path::Path;

use super::{AffinityComposer, ResourceGroupComposer};
use crate::domain::{ConfigError, CpuId};
use crate::workload::WorkloadSpec;

/// Fully wrapped command, ready to be sent to the target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComposedCommand(String);

impl ComposedCommand {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComposedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Wraps a base command with affinity (innermost) and cgroup (outermost).
///
/// The cgroup wrapper must be outermost: entering the cgroup starts a fresh
/// shell, and `taskset` has to run inside it.
#[derive(Debug, Clone, Default)]
pub struct CommandComposer {
    base: Option<String>,
    cpus: Option<Vec<CpuId>>,
    group: ResourceGroupComposer,
}

impl CommandComposer {
    pub fn new(base: Option<String>, cpus: Option<Vec<CpuId>>, group: Option<String>) -> Self {
        Self { base, cpus, group: ResourceGroupComposer::new(group) }
    }

    pub fn for_spec(spec: &WorkloadSpec) -> Self {
        Self::new(
            spec.command().map(str::to_string),
            spec.cpus().map(<[CpuId]>::to_vec),
            spec.cgroup().map(str::to_string),
        )
    }

    /// Build the final command.
    ///
    /// Affinity is only applied when a CPU set was configured.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingCommand`] if there is no base command,
    /// [`ConfigError::CpuOutOfRange`] if a CPU does not fit the affinity mask
    pub fn compose(&self, executables_dir: &Path) -> Result<ComposedCommand, ConfigError> {
        let base = self.base.as_deref().ok_or(ConfigError::MissingCommand)?;

        let mut command = base.to_string();
        if let Some(cpus) = &self.cpus {
            command = AffinityComposer::from_cpus(cpus)?.wrap(executables_dir, &command);
        }
        command = self.group.wrap(&command);

        debug!("composed command: {command}");
        Ok(ComposedCommand(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXEC_DIR: &str = "/data/local/tmp/bin";

    #[test]
    fn test_affinity_only() {
        let composer =
            CommandComposer::new(Some("echo hi".into()), Some(vec![CpuId(0), CpuId(2)]), None);
        let cmd = composer.compose(Path::new(EXEC_DIR)).unwrap();
        assert_eq!(cmd.as_str(), "/data/local/tmp/bin/taskset 0x5 echo hi");
    }

    #[test]
    fn test_group_only() {
        let composer = CommandComposer::new(Some("run.sh".into()), None, Some("g1".into()));
        let cmd = composer.compose(Path::new(EXEC_DIR)).unwrap();
        assert_eq!(cmd.as_str(), "cgroups_run_into g1 'run.sh'");
    }

    #[test]
    fn test_group_wraps_affinity() {
        let composer =
            CommandComposer::new(Some("run.sh".into()), Some(vec![CpuId(1)]), Some("g1".into()));
        let cmd = composer.compose(Path::new(EXEC_DIR)).unwrap();
        assert_eq!(cmd.as_str(), "cgroups_run_into g1 '/data/local/tmp/bin/taskset 0x2 run.sh'");
        assert!(cmd.as_str().starts_with("cgroups_run_into g1 '"));
        assert!(cmd.as_str().ends_with("taskset 0x2 run.sh'"));
    }

    #[test]
    fn test_missing_command() {
        let composer = CommandComposer::new(None, Some(vec![CpuId(0)]), None);
        assert!(matches!(
            composer.compose(Path::new(EXEC_DIR)),
            Err(ConfigError::MissingCommand)
        ));
    }

    #[test]
    fn test_compose_is_repeatable() {
        let composer = CommandComposer::new(Some("ls".into()), Some(vec![CpuId(3)]), None);
        let first = composer.compose(Path::new(EXEC_DIR)).unwrap();
        let second = composer.compose(Path::new(EXEC_DIR)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_cpu_beyond_mask_fails_composition() {
        let composer = CommandComposer::new(Some("echo hi".into()), Some(vec![CpuId(130)]), None);
        assert!(matches!(
            composer.compose(Path::new("/bin")),
            Err(ConfigError::CpuOutOfRange(CpuId(130)))
        ));
    }
}
