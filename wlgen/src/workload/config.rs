//! JSON workload configuration files
//!
//! ```json
//! {
//!   "workload": { "name": "hi", "command": "echo hi", "cpus": [0, 2] },
//!   "run": { "out_dir": "results", "ftrace": true, "start_pause_s": 1.0 }
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::WorkloadDefinition;
use crate::capture::{
    ftrace, systrace, FtraceCapture, SystraceCapture, SystraceRequest, TraceCapture,
};
use crate::controller::RunOptions;
use crate::domain::ConfigError;

/// A workload plus the options of its run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkloadConfig {
    pub workload: WorkloadDefinition,
    pub run: RunSettings,
}

impl WorkloadConfig {
    /// Load a configuration file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid JSON
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }
}

/// Systrace recorder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SystraceSettings {
    pub output: PathBuf,
    pub program: String,
    pub duration_s: u64,
}

impl Default for SystraceSettings {
    fn default() -> Self {
        Self {
            output: PathBuf::from("trace.html"),
            program: "systrace.py".to_string(),
            duration_s: systrace::DEFAULT_DURATION.as_secs(),
        }
    }
}

/// How a workload is run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSettings {
    pub background: bool,
    pub as_root: bool,
    pub out_dir: PathBuf,
    pub start_pause_s: Option<f64>,
    pub end_pause_s: Option<f64>,
    pub ftrace: bool,
    pub events: Vec<String>,
    pub buffer_kb: u32,
    pub systrace: Option<SystraceSettings>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            background: false,
            as_root: false,
            out_dir: PathBuf::from("./"),
            start_pause_s: None,
            end_pause_s: None,
            ftrace: false,
            events: ftrace::DEFAULT_EVENTS.iter().map(|e| (*e).to_string()).collect(),
            buffer_kb: ftrace::DEFAULT_BUFFER_KB,
            systrace: None,
        }
    }
}

impl RunSettings {
    /// Build run options, instantiating the requested trace mechanisms.
    ///
    /// Requesting both mechanisms is not rejected here; the controller
    /// refuses the run before touching the target.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidParams`] for negative or non-finite pauses
    pub fn to_run_options(&self) -> Result<RunOptions, ConfigError> {
        let ftrace = self.ftrace.then(|| {
            Box::new(FtraceCapture::new(self.events.clone(), self.buffer_kb))
                as Box<dyn TraceCapture>
        });
        let systrace = self.systrace.as_ref().map(|s| SystraceRequest {
            capture: Box::new(SystraceCapture::new(
                s.program.clone(),
                Duration::from_secs(s.duration_s),
                s.output.clone(),
            )),
            output: s.output.clone(),
        });

        Ok(RunOptions {
            background: self.background,
            as_root: self.as_root,
            out_dir: self.out_dir.clone(),
            start_pause: pause(self.start_pause_s)?,
            end_pause: pause(self.end_pause_s)?,
            ftrace,
            systrace,
        })
    }
}

fn pause(secs: Option<f64>) -> Result<Option<Duration>, ConfigError> {
    secs.map(|s| {
        Duration::try_from_secs_f64(s).map_err(|_| ConfigError::InvalidParams {
            kind: "run".to_string(),
            reason: format!("invalid pause {s}s"),
        })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "workload": {{"name": "hi", "command": "echo hi", "cpus": [0, 2]}},
                "run": {{"out_dir": "results", "ftrace": true, "end_pause_s": 0.5}}
            }}"#
        )
        .unwrap();

        let config = WorkloadConfig::from_file(file.path()).unwrap();
        assert_eq!(config.workload.name, "hi");
        assert_eq!(config.workload.cpus, Some(vec![0, 2]));
        assert!(config.run.ftrace);
        assert_eq!(config.run.out_dir, PathBuf::from("results"));
        assert_eq!(config.run.buffer_kb, ftrace::DEFAULT_BUFFER_KB);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"run": {{"backgroud": true}}}}"#).unwrap();
        assert!(WorkloadConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = WorkloadConfig::from_file("/nonexistent/wlgen.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }

    #[test]
    fn test_run_options_conversion() {
        let settings = RunSettings {
            start_pause_s: Some(2.0),
            ftrace: true,
            ..RunSettings::default()
        };
        let options = settings.to_run_options().unwrap();
        assert_eq!(options.start_pause, Some(Duration::from_secs(2)));
        assert_eq!(options.end_pause, None);
        assert!(options.ftrace.is_some());
        assert!(options.systrace.is_none());
    }

    #[test]
    fn test_negative_pause_rejected() {
        let settings = RunSettings { end_pause_s: Some(-0.1), ..RunSettings::default() };
        assert!(matches!(settings.to_run_options(), Err(ConfigError::InvalidParams { .. })));
    }
}
