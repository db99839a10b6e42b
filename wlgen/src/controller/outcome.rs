//! Results of a workload run
//!
//! A foreground run completes and yields a [`CompletedRun`]. A background run
//! yields a [`DetachedRun`]: the command is still running on the target and
//! any armed trace is still collecting until the caller stops it.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::capture::TraceCoordinator;
use crate::compose::ComposedCommand;
use crate::domain::TraceError;
use crate::target::Target;

/// A finished foreground run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedRun {
    /// Raw output of the command
    pub output: String,
    /// Pulled trace artifact, when tracing was enabled
    pub trace_file: Option<PathBuf>,
}

/// A command left running on the target.
pub struct DetachedRun {
    command: ComposedCommand,
    trace: TraceCoordinator,
}

impl DetachedRun {
    pub(crate) fn new(command: ComposedCommand, trace: TraceCoordinator) -> Self {
        Self { command, trace }
    }

    pub fn command(&self) -> &ComposedCommand {
        &self.command
    }

    /// True while the trace armed for this run is still collecting
    pub fn is_tracing(&self) -> bool {
        self.trace.is_armed()
    }

    /// Stop the trace armed for this run and pull it under `out_dir`.
    ///
    /// Returns `None` if no trace was armed or it was already stopped.
    ///
    /// # Errors
    /// Propagates trace stop/fetch failures
    pub fn stop_trace(
        &mut self,
        target: &dyn Target,
        out_dir: &Path,
    ) -> Result<Option<PathBuf>, TraceError> {
        self.trace.disarm(target, out_dir)
    }
}

impl fmt::Debug for DetachedRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetachedRun")
            .field("command", &self.command)
            .field("tracing", &self.is_tracing())
            .finish()
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(CompletedRun),
    Detached(DetachedRun),
}

impl RunOutcome {
    /// Command output; always empty for detached runs
    pub fn output(&self) -> &str {
        match self {
            RunOutcome::Completed(run) => &run.output,
            RunOutcome::Detached(_) => "",
        }
    }

    pub fn trace_file(&self) -> Option<&Path> {
        match self {
            RunOutcome::Completed(run) => run.trace_file.as_deref(),
            RunOutcome::Detached(_) => None,
        }
    }

    pub fn is_detached(&self) -> bool {
        matches!(self, RunOutcome::Detached(_))
    }

    pub fn into_completed(self) -> Option<CompletedRun> {
        match self {
            RunOutcome::Completed(run) => Some(run),
            RunOutcome::Detached(_) => None,
        }
    }

    pub fn into_detached(self) -> Option<DetachedRun> {
        match self {
            RunOutcome::Detached(run) => Some(run),
            RunOutcome::Completed(_) => None,
        }
    }
}
