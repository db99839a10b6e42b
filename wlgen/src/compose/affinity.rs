//! CPU affinity wrapping via `taskset`

use std::path::Path;

use crate::domain::{ConfigError, CpuId, CpuMask, WorkloadError};
use crate::target::Target;

/// Name of the affinity tool inside the target's executables directory
const TASKSET: &str = "taskset";

/// Affinity mask for a set of CPUs, plus the `taskset` prefix applying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AffinityComposer {
    mask: CpuMask,
}

impl AffinityComposer {
    /// Build the mask for an explicit CPU set
    ///
    /// # Errors
    /// Returns [`ConfigError::CpuOutOfRange`] for a CPU the mask cannot hold
    pub fn from_cpus(cpus: &[CpuId]) -> Result<Self, ConfigError> {
        let mut mask = 0u128;
        for &cpu in cpus {
            if cpu.0 >= CpuMask::CAPACITY {
                return Err(ConfigError::CpuOutOfRange(cpu));
            }
            mask |= 1u128 << cpu.0;
        }
        Ok(Self { mask: CpuMask(mask) })
    }

    /// Build the mask for `cpus`, or for every online CPU when `None`.
    ///
    /// An empty online list yields a zero mask; no special case is made for it.
    ///
    /// # Errors
    /// Returns an error if the online CPU query fails or a CPU is out of range
    pub fn resolve(target: &dyn Target, cpus: Option<&[CpuId]>) -> Result<Self, WorkloadError> {
        match cpus {
            Some(cpus) => Ok(Self::from_cpus(cpus)?),
            None => {
                let online = target.list_online_cpus().map_err(WorkloadError::Target)?;
                Ok(Self::from_cpus(&online)?)
            }
        }
    }

    #[must_use]
    pub fn mask(&self) -> CpuMask {
        self.mask
    }

    /// `taskset` invocation applying the mask, e.g. `/bin/taskset 0x5`
    #[must_use]
    pub fn prefix(&self, executables_dir: &Path) -> String {
        format!("{} {}", executables_dir.join(TASKSET).display(), self.mask)
    }

    /// Prefix `command` with the `taskset` invocation
    #[must_use]
    pub fn wrap(&self, executables_dir: &Path, command: &str) -> String {
        format!("{} {command}", self.prefix(executables_dir))
    }
}
