//! Arm/disarm lifecycle of the trace mechanism selected for a run

use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

use super::TraceCapture;
use crate::domain::{ConfigError, TraceError};
use crate::target::Target;

/// Systrace selection: the recorder plus the file it reports into.
pub struct SystraceRequest {
    pub capture: Box<dyn TraceCapture>,
    pub output: PathBuf,
}

enum Mechanism {
    Ftrace(Box<dyn TraceCapture>),
    Systrace { capture: Box<dyn TraceCapture>, output: PathBuf },
}

/// Brackets one workload run with trace start/stop.
///
/// Holds at most one mechanism. Without one, `arm` and `disarm` are no-ops.
pub struct TraceCoordinator {
    label: String,
    mechanism: Option<Mechanism>,
    armed: bool,
}

impl TraceCoordinator {
    /// Select the trace mechanism for a run of the workload labelled `label`.
    ///
    /// # Errors
    /// Returns [`ConfigError::ConflictingTraceModes`] if both mechanisms
    /// are requested
    pub fn new(
        label: impl Into<String>,
        ftrace: Option<Box<dyn TraceCapture>>,
        systrace: Option<SystraceRequest>,
    ) -> Result<Self, ConfigError> {
        let mechanism = match (ftrace, systrace) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingTraceModes),
            (Some(capture), None) => Some(Mechanism::Ftrace(capture)),
            (None, Some(req)) => {
                Some(Mechanism::Systrace { capture: req.capture, output: req.output })
            }
            (None, None) => None,
        };
        Ok(Self { label: label.into(), mechanism, armed: false })
    }

    pub fn is_enabled(&self) -> bool {
        self.mechanism.is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Where the artifact lands for `destination`: `<destination>/<label>.dat`
    /// for ftrace, the requested output file for systrace.
    pub fn artifact_path(&self, destination: &Path) -> Option<PathBuf> {
        match self.mechanism.as_ref()? {
            Mechanism::Ftrace(_) => Some(destination.join(format!("{}.dat", self.label))),
            Mechanism::Systrace { output, .. } => Some(output.clone()),
        }
    }

    /// Start capture, if a mechanism was selected.
    ///
    /// # Errors
    /// Propagates the mechanism's start failure
    pub fn arm(&mut self, target: &dyn Target) -> Result<(), TraceError> {
        let Some(mechanism) = self.mechanism.as_mut() else {
            return Ok(());
        };
        match mechanism {
            Mechanism::Ftrace(capture) => {
                info!("FTrace START");
                capture.start(target)?;
            }
            Mechanism::Systrace { capture, output } => {
                // the recorder writes its report while running
                ensure_parent(output)?;
                info!("Systrace START [{}]", output.display());
                capture.start(target)?;
            }
        }
        self.armed = true;
        Ok(())
    }

    /// Stop capture and pull the artifact under `destination`.
    ///
    /// Returns `None` when the coordinator was never armed.
    ///
    /// # Errors
    /// Propagates stop/fetch failures and errors creating the output folder
    pub fn disarm(
        &mut self,
        target: &dyn Target,
        destination: &Path,
    ) -> Result<Option<PathBuf>, TraceError> {
        if !self.armed {
            return Ok(None);
        }
        let Some(path) = self.artifact_path(destination) else {
            return Ok(None);
        };
        let Some(mechanism) = self.mechanism.as_mut() else {
            return Ok(None);
        };
        self.armed = false;

        let capture = match mechanism {
            Mechanism::Ftrace(capture) | Mechanism::Systrace { capture, .. } => capture,
        };
        capture.stop(target)?;
        info!("Trace STOP");

        ensure_parent(&path)?;

        info!("Pulling trace file into [{}]...", path.display());
        capture.fetch(target, &path)?;
        Ok(Some(path))
    }
}

/// Create the folder holding `path` if it is missing
fn ensure_parent(path: &Path) -> Result<(), TraceError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            debug!("Create trace results folder [{}]", dir.display());
            fs::create_dir_all(dir)?;
        }
    }
    Ok(())
}
