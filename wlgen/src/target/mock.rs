//! Recording test doubles for the target and trace collaborators.
//!
//! [`MockTarget`] and [`MockCapture`] append every call to a shared
//! [`Journal`] with a timestamp, so tests can assert on call ordering and on
//! the time spent between calls.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use super::Target;
use crate::capture::TraceCapture;
use crate::domain::{CpuId, TargetError, TraceError};

/// One collaborator interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListOnlineCpus,
    Execute { command: String, as_root: bool },
    KickOff { command: String, as_root: bool },
    ExecuteUtil { command: String },
    Pull { remote: PathBuf, local: PathBuf },
    TraceStart,
    TraceStop,
    TraceFetch { destination: PathBuf },
    Callback { destdir: PathBuf },
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub at: Instant,
    pub call: Call,
}

/// Shared, append-only call log.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Rc<RefCell<Vec<Entry>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: Call) {
        self.entries.borrow_mut().push(Entry { at: Instant::now(), call });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.entries.borrow().iter().map(|e| e.call.clone()).collect()
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.entries.borrow().clone()
    }

    /// Index of the first call matching `pred`
    pub fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.entries.borrow().iter().position(|e| pred(&e.call))
    }

    /// Timestamp of the first call matching `pred`
    pub fn time_of(&self, pred: impl Fn(&Call) -> bool) -> Option<Instant> {
        self.entries.borrow().iter().find(|e| pred(&e.call)).map(|e| e.at)
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.entries.borrow().iter().filter(|e| pred(&e.call)).count()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

/// Target that records calls and serves queued responses.
///
/// `execute` and `execute_util` pop from the response queue; once it is
/// empty they return an empty string.
pub struct MockTarget {
    journal: Journal,
    online: Vec<CpuId>,
    executables_dir: PathBuf,
    working_dir: PathBuf,
    responses: RefCell<VecDeque<Result<String, TargetError>>>,
    execute_delay: Duration,
    fail_kick_off: bool,
}

impl MockTarget {
    pub fn new(journal: Journal) -> Self {
        MockTarget {
            journal,
            online: vec![CpuId(0), CpuId(1), CpuId(2), CpuId(3)],
            executables_dir: PathBuf::from("/data/local/tmp/bin"),
            working_dir: PathBuf::from("/data/local/tmp"),
            responses: RefCell::new(VecDeque::new()),
            execute_delay: Duration::ZERO,
            fail_kick_off: false,
        }
    }

    #[must_use]
    pub fn with_online_cpus(mut self, cpus: Vec<CpuId>) -> Self {
        self.online = cpus;
        self
    }

    #[must_use]
    pub fn with_executables_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.executables_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_responses(self, responses: Vec<Result<String, TargetError>>) -> Self {
        self.responses.borrow_mut().extend(responses);
        self
    }

    /// Make every foreground execution take at least `delay`
    #[must_use]
    pub fn with_execute_delay(mut self, delay: Duration) -> Self {
        self.execute_delay = delay;
        self
    }

    #[must_use]
    pub fn failing_kick_off(mut self) -> Self {
        self.fail_kick_off = true;
        self
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    fn respond(&self) -> Result<String, TargetError> {
        if !self.execute_delay.is_zero() {
            thread::sleep(self.execute_delay);
        }
        self.responses.borrow_mut().pop_front().unwrap_or_else(|| Ok(String::new()))
    }
}

impl Target for MockTarget {
    fn list_online_cpus(&self) -> Result<Vec<CpuId>, TargetError> {
        self.journal.record(Call::ListOnlineCpus);
        Ok(self.online.clone())
    }

    fn executables_directory(&self) -> PathBuf {
        self.executables_dir.clone()
    }

    fn working_directory(&self) -> PathBuf {
        self.working_dir.clone()
    }

    fn execute(
        &self,
        command: &str,
        as_root: bool,
        _timeout: Option<Duration>,
    ) -> Result<String, TargetError> {
        self.journal.record(Call::Execute { command: command.to_string(), as_root });
        self.respond()
    }

    fn kick_off(&self, command: &str, as_root: bool) -> Result<(), TargetError> {
        self.journal.record(Call::KickOff { command: command.to_string(), as_root });
        if self.fail_kick_off {
            return Err(TargetError::SpawnFailed {
                command: command.to_string(),
                error: "mock: device unreachable".to_string(),
            });
        }
        Ok(())
    }

    fn execute_util(&self, command: &str) -> Result<String, TargetError> {
        self.journal.record(Call::ExecuteUtil { command: command.to_string() });
        self.respond()
    }

    fn pull(&self, remote: &Path, local: &Path) -> Result<(), TargetError> {
        self.journal.record(Call::Pull { remote: remote.to_path_buf(), local: local.to_path_buf() });
        Ok(())
    }
}

/// Which [`MockCapture`] operation should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFailure {
    Start,
    Stop,
    Fetch,
}

/// Trace capture that records calls and writes a placeholder artifact.
pub struct MockCapture {
    journal: Journal,
    failure: Option<CaptureFailure>,
}

impl MockCapture {
    pub fn new(journal: Journal) -> Self {
        MockCapture { journal, failure: None }
    }

    #[must_use]
    pub fn failing(mut self, failure: CaptureFailure) -> Self {
        self.failure = Some(failure);
        self
    }
}

impl TraceCapture for MockCapture {
    fn start(&mut self, _target: &dyn Target) -> Result<(), TraceError> {
        self.journal.record(Call::TraceStart);
        if self.failure == Some(CaptureFailure::Start) {
            return Err(TraceError::StartFailed("mock: tracer busy".to_string()));
        }
        Ok(())
    }

    fn stop(&mut self, _target: &dyn Target) -> Result<(), TraceError> {
        self.journal.record(Call::TraceStop);
        if self.failure == Some(CaptureFailure::Stop) {
            return Err(TraceError::StopFailed("mock: tracer gone".to_string()));
        }
        Ok(())
    }

    fn fetch(&mut self, _target: &dyn Target, destination: &Path) -> Result<(), TraceError> {
        self.journal.record(Call::TraceFetch { destination: destination.to_path_buf() });
        if self.failure == Some(CaptureFailure::Fetch) {
            return Err(TraceError::FetchFailed {
                path: destination.to_path_buf(),
                reason: "mock: transfer failed".to_string(),
            });
        }
        fs::write(destination, b"mock trace")?;
        Ok(())
    }
}
