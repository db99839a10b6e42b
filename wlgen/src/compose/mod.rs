//! Command composition
//!
//! Builds the final command string sent to the target from a base command:
//! - `affinity`: `taskset` prefix restricting the command to a CPU set
//! - `cgroup`: `cgroups_run_into` wrapper placing the command in a cgroup
//! - `command`: applies both in their fixed nesting order

pub mod affinity;
pub mod cgroup;
pub mod command;

pub use affinity::AffinityComposer;
pub use cgroup::ResourceGroupComposer;
pub use command::{CommandComposer, ComposedCommand};
