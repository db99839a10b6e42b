//! Host-side systrace recording

use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use super::TraceCapture;
use crate::domain::TraceError;
use crate::target::Target;

/// Recording length used when none is configured
pub const DEFAULT_DURATION: Duration = Duration::from_secs(10);

/// Runs a systrace-style recorder on the host for a fixed duration.
///
/// The recorder is invoked as `<program> -t <seconds> -o <output>`; `stop`
/// waits for it to finish writing its report.
#[derive(Debug)]
pub struct SystraceCapture {
    program: String,
    duration: Duration,
    output: PathBuf,
    child: Option<Child>,
}

impl SystraceCapture {
    pub fn new(program: impl Into<String>, duration: Duration, output: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), duration, output: output.into(), child: None }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

impl TraceCapture for SystraceCapture {
    fn start(&mut self, _target: &dyn Target) -> Result<(), TraceError> {
        let seconds = self.duration.as_secs().max(1).to_string();
        debug!("systrace: {} -t {seconds} -o {}", self.program, self.output.display());

        let child = Command::new(&self.program)
            .arg("-t")
            .arg(&seconds)
            .arg("-o")
            .arg(&self.output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|e| TraceError::StartFailed(format!("{}: {e}", self.program)))?;
        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self, _target: &dyn Target) -> Result<(), TraceError> {
        let Some(mut child) = self.child.take() else {
            warn!("Systrace is not running!");
            return Err(TraceError::StopFailed("systrace is not running".to_string()));
        };
        debug!("Waiting systrace report [{}]...", self.output.display());
        let status = child.wait()?;
        if !status.success() {
            return Err(TraceError::StopFailed(format!("{} exited with {status}", self.program)));
        }
        Ok(())
    }

    fn fetch(&mut self, _target: &dyn Target, destination: &Path) -> Result<(), TraceError> {
        if destination == self.output {
            return Ok(());
        }
        fs::copy(&self.output, destination).map_err(|e| TraceError::FetchFailed {
            path: destination.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}
