//! Kernel function tracing with `trace-cmd`

use log::debug;
use std::path::{Path, PathBuf};

use super::TraceCapture;
use crate::domain::{TargetError, TraceError};
use crate::target::Target;

/// Events collected when none are configured
pub const DEFAULT_EVENTS: &[&str] = &["sched_switch", "sched_wakeup", "cpu_frequency", "cpu_idle"];

/// Per-CPU ring buffer size in KiB
pub const DEFAULT_BUFFER_KB: u32 = 10 * 1024;

/// Collects an ftrace with `trace-cmd` on the target and pulls the
/// extracted `.dat` file to the host.
#[derive(Debug, Clone)]
pub struct FtraceCapture {
    events: Vec<String>,
    buffer_kb: u32,
    remote_file: Option<PathBuf>,
}

impl Default for FtraceCapture {
    fn default() -> Self {
        Self::new(DEFAULT_EVENTS.iter().map(|e| (*e).to_string()).collect(), DEFAULT_BUFFER_KB)
    }
}

impl FtraceCapture {
    pub fn new(events: Vec<String>, buffer_kb: u32) -> Self {
        Self { events, buffer_kb, remote_file: None }
    }

    /// Extract into `path` on the target instead of `<workdir>/trace.dat`
    #[must_use]
    pub fn with_remote_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.remote_file = Some(path.into());
        self
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    fn start_command(&self) -> String {
        let mut cmd = format!("trace-cmd start -b {}", self.buffer_kb);
        for event in &self.events {
            cmd.push_str(" -e ");
            cmd.push_str(event);
        }
        cmd
    }

    fn remote_file(&self, target: &dyn Target) -> PathBuf {
        self.remote_file.clone().unwrap_or_else(|| target.working_directory().join("trace.dat"))
    }
}

fn run(target: &dyn Target, command: &str) -> Result<String, TargetError> {
    debug!("ftrace: {command}");
    target.execute(command, true, None)
}

impl TraceCapture for FtraceCapture {
    fn start(&mut self, target: &dyn Target) -> Result<(), TraceError> {
        run(target, "trace-cmd reset").map_err(|e| TraceError::StartFailed(e.to_string()))?;
        run(target, &self.start_command()).map_err(|e| TraceError::StartFailed(e.to_string()))?;
        Ok(())
    }

    fn stop(&mut self, target: &dyn Target) -> Result<(), TraceError> {
        run(target, "trace-cmd stop").map_err(|e| TraceError::StopFailed(e.to_string()))?;
        Ok(())
    }

    fn fetch(&mut self, target: &dyn Target, destination: &Path) -> Result<(), TraceError> {
        let remote = self.remote_file(target);
        let fetch_failed =
            |e: TargetError| TraceError::FetchFailed { path: destination.to_path_buf(), reason: e.to_string() };

        run(target, &format!("trace-cmd extract -o {}", remote.display())).map_err(fetch_failed)?;
        target.pull(&remote, destination).map_err(fetch_failed)?;
        Ok(())
    }
}
