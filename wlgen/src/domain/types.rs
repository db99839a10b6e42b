//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers keep CPU indices, affinity masks and process IDs
//! from being mixed up in composer and resolver signatures.

use std::fmt;

/// CPU ID
///
/// Represents a schedulable CPU core on the target (0, 1, 2, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CpuId(pub u32);

impl fmt::Display for CpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CPU:{}", self.0)
    }
}

/// Process ID
///
/// Represents a process ID observed on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID:{}", self.0)
    }
}

impl From<u32> for Pid {
    fn from(pid: u32) -> Self {
        Pid(pid)
    }
}

/// CPU affinity bitmask
///
/// Bit `i` is set iff CPU `i` is part of the set. Displays in the
/// `0x<HEX>` form understood by `taskset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CpuMask(pub u128);

impl CpuMask {
    /// Number of CPUs a mask can address
    pub const CAPACITY: u32 = u128::BITS;

    /// Returns true if CPU `cpu` is part of the mask
    #[must_use]
    pub fn contains(self, cpu: CpuId) -> bool {
        cpu.0 < Self::CAPACITY && self.0 & (1u128 << cpu.0) != 0
    }

    /// Returns true if no CPU is selected
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for CpuMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}
