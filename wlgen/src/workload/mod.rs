//! Workload description
//!
//! A [`WorkloadDefinition`] is the raw, serde-friendly description of a
//! workload. Configuring it against a [`KindRegistry`] yields an immutable
//! [`WorkloadSpec`] used for every run until the workload is reconfigured.

pub mod config;
pub mod kind;

use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::{ConfigError, CpuId};

pub use config::{RunSettings, SystraceSettings, WorkloadConfig};
pub use kind::{KindParams, KindRegistry};

/// Raw workload description, as found in configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkloadDefinition {
    pub name: String,
    pub kind: String,
    pub params: serde_json::Value,
    pub command: Option<String>,
    pub cpus: Option<Vec<u32>>,
    pub cgroup: Option<String>,
    pub duration_s: Option<f64>,
    pub run_dir: Option<PathBuf>,
    pub exc_id: u32,
    pub executor: Option<String>,
}

impl Default for WorkloadDefinition {
    fn default() -> Self {
        Self {
            name: "workload".to_string(),
            kind: "custom".to_string(),
            params: serde_json::Value::Null,
            command: None,
            cpus: None,
            cgroup: None,
            duration_s: None,
            run_dir: None,
            exc_id: 0,
            executor: None,
        }
    }
}

/// Validated workload, read-only for the duration of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadSpec {
    name: String,
    kind: String,
    params: KindParams,
    command: Option<String>,
    cpus: Option<Vec<CpuId>>,
    cgroup: Option<String>,
    duration: Option<Duration>,
    run_dir: PathBuf,
    exc_id: u32,
    executor: Option<String>,
}

impl WorkloadSpec {
    /// Validate `def`; `default_run_dir` is used when it names no run folder.
    ///
    /// # Errors
    /// Returns [`ConfigError::UnsupportedKind`] for unknown kinds,
    /// [`ConfigError::InvalidParams`] for bad payloads or durations
    pub fn configure(
        def: WorkloadDefinition,
        registry: &KindRegistry,
        default_run_dir: &Path,
    ) -> Result<Self, ConfigError> {
        let params = registry.construct(&def.kind, def.params)?;

        let duration = def
            .duration_s
            .map(|secs| {
                Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidParams {
                    kind: def.kind.clone(),
                    reason: format!("invalid duration {secs}s"),
                })
            })
            .transpose()?;

        info!("Setup new workload {}", def.name);

        Ok(Self {
            name: def.name,
            kind: def.kind,
            params,
            command: def.command,
            cpus: def.cpus.map(|cpus| cpus.into_iter().map(CpuId).collect()),
            cgroup: def.cgroup,
            duration,
            run_dir: def.run_dir.unwrap_or_else(|| default_run_dir.to_path_buf()),
            exc_id: def.exc_id,
            executor: def.executor,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn params(&self) -> &KindParams {
        &self.params
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub fn cpus(&self) -> Option<&[CpuId]> {
        self.cpus.as_deref()
    }

    pub fn cgroup(&self) -> Option<&str> {
        self.cgroup.as_deref()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn exc_id(&self) -> u32 {
        self.exc_id
    }

    /// Name of the executable to look for in process listings
    pub fn executor(&self) -> Option<&str> {
        self.executor.as_deref()
    }

    /// `<name>_<exc_id>`, used to name trace artifacts
    pub fn label(&self) -> String {
        format!("{}_{:02}", self.name, self.exc_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn configure(def: WorkloadDefinition) -> Result<WorkloadSpec, ConfigError> {
        WorkloadSpec::configure(def, KindRegistry::builtin(), Path::new("/data/local/tmp"))
    }

    #[test]
    fn test_defaults() {
        let spec = configure(WorkloadDefinition::default()).unwrap();
        assert_eq!(spec.kind(), "custom");
        assert_eq!(spec.run_dir(), Path::new("/data/local/tmp"));
        assert_eq!(spec.label(), "workload_00");
        assert!(spec.cpus().is_none());
        assert!(spec.command().is_none());
    }

    #[test]
    fn test_label_includes_execution_id() {
        let spec = configure(WorkloadDefinition {
            name: "mp3".into(),
            exc_id: 7,
            ..WorkloadDefinition::default()
        })
        .unwrap();
        assert_eq!(spec.label(), "mp3_07");
    }

    #[test]
    fn test_fields_carried_over() {
        let spec = configure(WorkloadDefinition {
            command: Some("run.sh".into()),
            cpus: Some(vec![0, 2]),
            cgroup: Some("g1".into()),
            duration_s: Some(1.5),
            run_dir: Some("/run".into()),
            executor: Some("rt-app".into()),
            ..WorkloadDefinition::default()
        })
        .unwrap();
        assert_eq!(spec.command(), Some("run.sh"));
        assert_eq!(spec.cpus(), Some(&[CpuId(0), CpuId(2)][..]));
        assert_eq!(spec.cgroup(), Some("g1"));
        assert_eq!(spec.duration(), Some(Duration::from_millis(1500)));
        assert_eq!(spec.run_dir(), Path::new("/run"));
        assert_eq!(spec.executor(), Some("rt-app"));
    }

    #[test]
    fn test_unsupported_kind_is_config_error() {
        let err = configure(WorkloadDefinition {
            kind: "geekbench".into(),
            ..WorkloadDefinition::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedKind(_)));
    }

    #[test]
    fn test_negative_duration_rejected() {
        let err = configure(WorkloadDefinition {
            duration_s: Some(-1.0),
            ..WorkloadDefinition::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParams { .. }));
    }

    #[test]
    fn test_profile_params() {
        let spec = configure(WorkloadDefinition {
            kind: "profile".into(),
            params: json!({"worker": {"period_ms": 16}}),
            ..WorkloadDefinition::default()
        })
        .unwrap();
        assert_eq!(spec.params().task_names(), vec!["worker"]);
    }

    #[test]
    fn test_definition_from_json() {
        let def: WorkloadDefinition =
            serde_json::from_value(json!({"name": "hi", "command": "echo hi", "cpus": [1]}))
                .unwrap();
        assert_eq!(def.kind, "custom");
        assert_eq!(def.cpus, Some(vec![1]));
    }
}
