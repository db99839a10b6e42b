//! CPU utility functions
//!
//! Parsing of the kernel CPU list format used by
//! `/sys/devices/system/cpu/online` and by the `--cpus` flag.

use crate::domain::{ConfigError, CpuId, CpuMask};

/// Parse a CPU list like "0-3" or "0-3,8-11" or "0,2"
///
/// Returns CPU IDs in the order they appear in the list.
///
/// # Errors
/// Returns [`ConfigError::InvalidCpuList`] on malformed entries or
/// descending ranges, [`ConfigError::CpuOutOfRange`] for CPUs an affinity
/// mask cannot hold
pub fn parse_cpu_list(list: &str) -> Result<Vec<CpuId>, ConfigError> {
    let list = list.trim();
    let invalid = || ConfigError::InvalidCpuList(list.to_string());

    if list.is_empty() {
        return Ok(Vec::new());
    }

    let mut cpus = Vec::new();

    for range in list.split(',') {
        let range = range.trim();
        if let Some((start, end)) = range.split_once('-') {
            // Range like "0-3"
            let start: u32 = start.trim().parse().map_err(|_| invalid())?;
            let end: u32 = end.trim().parse().map_err(|_| invalid())?;
            if start > end {
                return Err(invalid());
            }
            check_range(end)?;
            cpus.extend((start..=end).map(CpuId));
        } else {
            // Single CPU like "5"
            let cpu: u32 = range.parse().map_err(|_| invalid())?;
            check_range(cpu)?;
            cpus.push(CpuId(cpu));
        }
    }

    Ok(cpus)
}

fn check_range(cpu: u32) -> Result<(), ConfigError> {
    if cpu >= CpuMask::CAPACITY {
        return Err(ConfigError::CpuOutOfRange(CpuId(cpu)));
    }
    Ok(())
}
