//! Structured error types for wlgen
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! Configuration errors are raised before any remote interaction; the other
//! variants wrap a failure reported by a collaborator.

use std::path::PathBuf;
use thiserror::Error;

use super::types::CpuId;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No workload configured")]
    NotConfigured,

    #[error("Workload has no command to execute")]
    MissingCommand,

    #[error("Callbacks for step [{0}] not supported")]
    UnknownStep(String),

    #[error("{0} is not a supported workload kind")]
    UnsupportedKind(String),

    #[error("ftrace and systrace capture are mutually exclusive")]
    ConflictingTraceModes,

    #[error("Invalid parameters for {kind} workload: {reason}")]
    InvalidParams { kind: String, reason: String },

    #[error("Process table has no column named '{0}'")]
    MissingColumn(String),

    #[error("Invalid CPU list '{0}'")]
    InvalidCpuList(String),

    #[error("{0} is outside the supported affinity range (CPU:0 to CPU:127)")]
    CpuOutOfRange(CpuId),
}

#[derive(Error, Debug)]
pub enum TargetError {
    #[error("Command '{command}' exited with status {code}: {output}")]
    CommandFailed { command: String, code: i32, output: String },

    #[error("Failed to spawn '{command}': {error}")]
    SpawnFailed { command: String, error: String },

    #[error("Command '{command}' timed out after {seconds:.1}s")]
    Timeout { command: String, seconds: f64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Failed to start trace capture: {0}")]
    StartFailed(String),

    #[error("Failed to stop trace capture: {0}")]
    StopFailed(String),

    #[error("Failed to fetch trace into {path}: {reason}")]
    FetchFailed { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum WorkloadError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Workload execution failed")]
    Execution(#[source] TargetError),

    #[error("Background dispatch failed")]
    Dispatch(#[source] TargetError),

    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error("Target query failed")]
    Target(#[source] TargetError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl WorkloadError {
    /// True for errors raised while validating configuration, before any
    /// remote interaction took place.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, WorkloadError::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_step_display() {
        let err = ConfigError::UnknownStep("prerun".to_string());
        assert_eq!(err.to_string(), "Callbacks for step [prerun] not supported");
    }

    #[test]
    fn test_command_failed_error() {
        let err = TargetError::CommandFailed {
            command: "false".to_string(),
            code: 1,
            output: "boom".to_string(),
        };
        assert!(err.to_string().contains("'false'"));
        assert!(err.to_string().contains("status 1"));
    }

    #[test]
    fn test_configuration_classification() {
        let config: WorkloadError = ConfigError::MissingCommand.into();
        assert!(config.is_configuration());

        let exec = WorkloadError::Execution(TargetError::Timeout {
            command: "sleep 10".to_string(),
            seconds: 1.0,
        });
        assert!(!exec.is_configuration());
    }
}
