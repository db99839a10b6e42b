//! Target device abstraction
//!
//! The orchestrator never talks to a device directly. Everything it needs
//! (online CPUs, tool locations, foreground/background execution, file
//! transfer) goes through the [`Target`] trait:
//! - `local`: runs commands on this host through `sh -c`
//! - `mock`: recording test double with a shared call journal
//! - `cpu_utils`: CPU list parsing shared by targets and the CLI

pub mod cpu_utils;
pub mod local;
pub mod mock;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::{CpuId, TargetError};

pub use cpu_utils::parse_cpu_list;
pub use local::LocalTarget;

/// A device able to run workload commands.
///
/// Implementations report non-zero exits as [`TargetError::CommandFailed`].
pub trait Target {
    /// CPUs currently online on the device
    ///
    /// # Errors
    /// Returns an error if the CPU topology cannot be queried
    fn list_online_cpus(&self) -> Result<Vec<CpuId>, TargetError>;

    /// Directory holding the helper executables (`taskset`, `shutils`, ...)
    fn executables_directory(&self) -> PathBuf;

    /// Default directory for workload runs
    fn working_directory(&self) -> PathBuf;

    /// Run `command` and block until it completes, returning its output.
    ///
    /// # Errors
    /// Fails on spawn errors, non-zero exit status or timeout expiry
    fn execute(
        &self,
        command: &str,
        as_root: bool,
        timeout: Option<Duration>,
    ) -> Result<String, TargetError>;

    /// Start `command` without waiting for it.
    ///
    /// # Errors
    /// Fails if the command could not be dispatched
    fn kick_off(&self, command: &str, as_root: bool) -> Result<(), TargetError>;

    /// Run `command` through the privileged utility script of the target.
    ///
    /// # Errors
    /// Fails on spawn errors or non-zero exit status
    fn execute_util(&self, command: &str) -> Result<String, TargetError>;

    /// Copy `remote` from the device into the host path `local`.
    ///
    /// # Errors
    /// Fails if the file cannot be transferred
    fn pull(&self, remote: &Path, local: &Path) -> Result<(), TargetError>;
}
