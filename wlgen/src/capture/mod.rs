//! Trace capture around workload execution
//!
//! - [`TraceCapture`]: start/stop/fetch contract implemented by each mechanism
//! - `coordinator`: arms and disarms the selected mechanism for one run
//! - `ftrace`: kernel function trace collected with `trace-cmd` on the target
//! - `systrace`: host-side recorder writing to a caller-supplied file

pub mod coordinator;
pub mod ftrace;
pub mod systrace;

use std::path::Path;

use crate::domain::TraceError;
use crate::target::Target;

pub use coordinator::{SystraceRequest, TraceCoordinator};
pub use ftrace::FtraceCapture;
pub use systrace::SystraceCapture;

/// A trace collection mechanism.
pub trait TraceCapture {
    /// Begin collecting
    ///
    /// # Errors
    /// Returns [`TraceError::StartFailed`] if collection could not begin
    fn start(&mut self, target: &dyn Target) -> Result<(), TraceError>;

    /// Stop collecting
    ///
    /// # Errors
    /// Returns [`TraceError::StopFailed`] if collection could not be stopped
    fn stop(&mut self, target: &dyn Target) -> Result<(), TraceError>;

    /// Store the collected trace at `destination` on the host
    ///
    /// # Errors
    /// Returns [`TraceError::FetchFailed`] if the trace could not be retrieved
    fn fetch(&mut self, target: &dyn Target, destination: &Path) -> Result<(), TraceError>;
}
