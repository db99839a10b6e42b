//! # Workload Execution Controller
//!
//! Drives one workload run through a fixed sequence of states:
//!
//! ```text
//! Idle → Composed → [Armed] → PrePaused → Executing ─┬─ background: return DetachedRun
//!                                                     └─ foreground: PostPaused → Disarmed
//!                                                                    → CallbackInvoked → Done
//! ```
//!
//! Any collaborator failure moves the controller to `Failed` and is returned
//! to the caller; nothing is retried.
//!
//! Trace capture starts before the pre-execution pause and stops after the
//! post-execution pause, so the trace includes idle time on both sides of
//! the workload.

pub mod outcome;

use log::{debug, info};
use std::fmt;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crate::callbacks::{CallbackArgs, CallbackRegistry, Step};
use crate::capture::{SystraceRequest, TraceCapture, TraceCoordinator};
use crate::compose::{AffinityComposer, CommandComposer, ComposedCommand};
use crate::domain::{ConfigError, CpuId, CpuMask, WorkloadError};
use crate::instances::{self, Instance};
use crate::target::Target;
use crate::tasks::{ProcessTable, TaskResolver, TaskTable};
use crate::workload::{KindRegistry, WorkloadDefinition, WorkloadSpec};

pub use outcome::{CompletedRun, DetachedRun, RunOutcome};

/// Per-run options.
pub struct RunOptions {
    /// Dispatch without waiting; the caller collects results
    pub background: bool,
    pub as_root: bool,
    /// Folder receiving the trace artifact, passed to the post-run callback
    pub out_dir: PathBuf,
    /// Wait before executing, after the trace is armed
    pub start_pause: Option<Duration>,
    /// Wait after executing, before the trace is stopped
    pub end_pause: Option<Duration>,
    pub ftrace: Option<Box<dyn TraceCapture>>,
    pub systrace: Option<SystraceRequest>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            background: false,
            as_root: false,
            out_dir: PathBuf::from("./"),
            start_pause: None,
            end_pause: None,
            ftrace: None,
            systrace: None,
        }
    }
}

impl RunOptions {
    #[must_use]
    pub fn in_background(mut self) -> Self {
        self.background = true;
        self
    }

    #[must_use]
    pub fn as_root(mut self) -> Self {
        self.as_root = true;
        self
    }

    #[must_use]
    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = out_dir.into();
        self
    }

    #[must_use]
    pub fn with_pauses(mut self, start: Option<Duration>, end: Option<Duration>) -> Self {
        self.start_pause = start;
        self.end_pause = end;
        self
    }

    #[must_use]
    pub fn with_ftrace(mut self, capture: impl TraceCapture + 'static) -> Self {
        self.ftrace = Some(Box::new(capture));
        self
    }

    #[must_use]
    pub fn with_systrace(
        mut self,
        capture: impl TraceCapture + 'static,
        output: impl Into<PathBuf>,
    ) -> Self {
        self.systrace = Some(SystraceRequest { capture: Box::new(capture), output: output.into() });
        self
    }
}

/// Position of the controller in the run lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Composed,
    Armed,
    PrePaused,
    Executing,
    PostPaused,
    Disarmed,
    CallbackInvoked,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Runs a configured workload on a target.
///
/// One controller per workload: the callback table and the task table live
/// as long as the controller and are shared by all its runs. Not meant to be
/// shared between threads.
pub struct ExecutionController<T: Target> {
    target: T,
    registry: KindRegistry,
    spec: Option<WorkloadSpec>,
    composed: Option<ComposedCommand>,
    callbacks: CallbackRegistry,
    tasks: TaskResolver,
    state: RunState,
    output: Option<String>,
}

impl<T: Target> ExecutionController<T> {
    /// Controller using the builtin workload kinds
    pub fn new(target: T) -> Self {
        Self::with_registry(target, KindRegistry::builtin().clone())
    }

    pub fn with_registry(target: T, registry: KindRegistry) -> Self {
        Self {
            target,
            registry,
            spec: None,
            composed: None,
            callbacks: CallbackRegistry::new(),
            tasks: TaskResolver::new(),
            state: RunState::Idle,
            output: None,
        }
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn spec(&self) -> Option<&WorkloadSpec> {
        self.spec.as_ref()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Output of the last run: the command output for foreground runs, an
    /// empty string for background ones
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn callbacks_mut(&mut self) -> &mut CallbackRegistry {
        &mut self.callbacks
    }

    pub fn set_callback(&mut self, step: Step, handler: impl FnMut(&CallbackArgs<'_>) + 'static) {
        self.callbacks.register(step, handler);
    }

    /// Validate and install a workload description.
    ///
    /// Tasks declared by the workload kind are tracked for later resolution.
    ///
    /// # Errors
    /// Returns a configuration error for unsupported kinds or invalid params
    pub fn configure(&mut self, def: WorkloadDefinition) -> Result<&WorkloadSpec, WorkloadError> {
        let spec = WorkloadSpec::configure(def, &self.registry, &self.target.working_directory())?;
        for name in spec.params().task_names() {
            self.tasks.track(name);
        }
        self.composed = None;
        self.output = None;
        self.state = RunState::Idle;
        Ok(&*self.spec.insert(spec))
    }

    /// Affinity mask for `cpus`, or for all online CPUs when `None`
    ///
    /// # Errors
    /// Fails if the online CPU query fails or a CPU is out of range
    pub fn cpus_mask(&self, cpus: Option<&[CpuId]>) -> Result<CpuMask, WorkloadError> {
        AffinityComposer::resolve(&self.target, cpus).map(|composer| composer.mask())
    }

    /// The command a run would send to the target, built once per
    /// configuration.
    ///
    /// # Errors
    /// Returns a configuration error if no workload or no command is set
    pub fn composed_command(&mut self) -> Result<ComposedCommand, WorkloadError> {
        if let Some(command) = &self.composed {
            return Ok(command.clone());
        }
        let spec = self.spec.as_ref().ok_or(ConfigError::NotConfigured)?;
        let command =
            CommandComposer::for_spec(spec).compose(&self.target.executables_directory())?;
        self.composed = Some(command.clone());
        Ok(command)
    }

    /// Run the configured workload.
    ///
    /// # Errors
    /// Configuration errors are returned before the target is touched.
    /// Trace, dispatch and execution failures abort the run.
    pub fn run(&mut self, options: RunOptions) -> Result<RunOutcome, WorkloadError> {
        self.state = RunState::Idle;
        let result = self.run_steps(options);
        if result.is_err() {
            self.enter(RunState::Failed);
        }
        result
    }

    fn run_steps(&mut self, options: RunOptions) -> Result<RunOutcome, WorkloadError> {
        let RunOptions { background, as_root, out_dir, start_pause, end_pause, ftrace, systrace } =
            options;

        let spec = self.spec.as_ref().ok_or(ConfigError::NotConfigured)?;
        let privileged = spec.cgroup().is_some();
        let mut trace = TraceCoordinator::new(spec.label(), ftrace, systrace)?;

        let command = self.composed_command()?;
        self.enter(RunState::Composed);

        if trace.is_enabled() {
            trace.arm(&self.target)?;
            self.enter(RunState::Armed);
        }

        if let Some(pause) = start_pause.filter(|p| !p.is_zero()) {
            info!("Waiting {:.3} seconds before starting workload execution", pause.as_secs_f64());
            thread::sleep(pause);
        }
        self.enter(RunState::PrePaused);

        if background {
            debug!("Workload [background]: {command}");
            self.target.kick_off(command.as_str(), as_root).map_err(WorkloadError::Dispatch)?;
            self.output = Some(String::new());
            self.enter(RunState::Executing);
            return Ok(RunOutcome::Detached(DetachedRun::new(command, trace)));
        }

        self.enter(RunState::Executing);
        info!("Workload execution START:");
        info!("   {command}");

        // cgroup placement needs the privileged utility path
        let result = if privileged {
            self.target.execute_util(command.as_str())
        } else {
            self.target.execute(command.as_str(), as_root, None)
        };
        let output = result.map_err(WorkloadError::Execution)?;
        self.output = Some(output.clone());

        if let Some(pause) = end_pause.filter(|p| !p.is_zero()) {
            info!("Waiting {:.3} seconds before stopping trace collection", pause.as_secs_f64());
            thread::sleep(pause);
        }
        self.enter(RunState::PostPaused);

        let trace_file = trace.disarm(&self.target, &out_dir)?;
        self.enter(RunState::Disarmed);

        self.callbacks.invoke(Step::PostRun, &CallbackArgs { destdir: &out_dir });
        self.enter(RunState::CallbackInvoked);

        debug!("Workload execution COMPLETED");
        self.enter(RunState::Done);
        Ok(RunOutcome::Completed(CompletedRun { output, trace_file }))
    }

    fn enter(&mut self, state: RunState) {
        debug!("{} -> {state}", self.state);
        self.state = state;
    }

    pub fn tasks(&self) -> &TaskTable {
        self.tasks.tasks()
    }

    pub fn task_resolver_mut(&mut self) -> &mut TaskResolver {
        &mut self.tasks
    }

    /// Resolve task PIDs from a process snapshot; see [`TaskResolver::resolve`]
    ///
    /// # Errors
    /// Fails if the snapshot lacks the `comm` or `pid` column
    pub fn resolve_tasks(
        &mut self,
        table: Option<&ProcessTable>,
        names: Option<&[&str]>,
    ) -> Result<&TaskTable, WorkloadError> {
        Ok(self.tasks.resolve(table, names)?)
    }

    /// Running instances of the workload executor; empty when the workload
    /// names no executor
    ///
    /// # Errors
    /// Fails if the process listing fails on the target
    pub fn list_instances(&self) -> Result<Vec<Instance>, WorkloadError> {
        match self.spec.as_ref().and_then(WorkloadSpec::executor) {
            Some(executor) => {
                instances::list_instances(&self.target, executor, false).map_err(WorkloadError::Target)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Kill every running instance of the workload executor
    ///
    /// # Errors
    /// Fails if listing or killing fails on the target
    pub fn kill_all(&self) -> Result<Vec<Instance>, WorkloadError> {
        match self.spec.as_ref().and_then(WorkloadSpec::executor) {
            Some(executor) => instances::kill_all(&self.target, executor).map_err(WorkloadError::Target),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::mock::{Call, Journal, MockCapture, MockTarget};
    use std::cell::Cell;
    use std::rc::Rc;

    fn controller(journal: &Journal) -> ExecutionController<MockTarget> {
        ExecutionController::new(MockTarget::new(journal.clone()))
    }

    fn echo() -> WorkloadDefinition {
        WorkloadDefinition { command: Some("echo hi".into()), ..WorkloadDefinition::default() }
    }

    #[test]
    fn test_run_without_configure() {
        let journal = Journal::new();
        let mut ctl = controller(&journal);
        let err = ctl.run(RunOptions::default()).unwrap_err();
        assert!(matches!(err, WorkloadError::Config(ConfigError::NotConfigured)));
        assert_eq!(ctl.state(), RunState::Failed);
    }

    #[test]
    fn test_missing_command_fails_before_target() {
        let journal = Journal::new();
        let mut ctl = controller(&journal);
        ctl.configure(WorkloadDefinition::default()).unwrap();

        let err = ctl.run(RunOptions::default().with_ftrace(MockCapture::new(journal.clone())));
        assert!(matches!(err, Err(WorkloadError::Config(ConfigError::MissingCommand))));
        assert!(journal.calls().is_empty());
    }

    #[test]
    fn test_foreground_run_reaches_done() {
        let journal = Journal::new();
        let target = MockTarget::new(journal.clone()).with_responses(vec![Ok("hi\n".into())]);
        let mut ctl = ExecutionController::new(target);
        ctl.configure(echo()).unwrap();

        let outcome = ctl.run(RunOptions::default()).unwrap();
        assert_eq!(outcome.output(), "hi\n");
        assert_eq!(outcome.trace_file(), None);
        assert_eq!(ctl.state(), RunState::Done);
        assert_eq!(ctl.output(), Some("hi\n"));
    }

    #[test]
    fn test_cgroup_forces_privileged_path() {
        let journal = Journal::new();
        let mut ctl = controller(&journal);
        ctl.configure(WorkloadDefinition { cgroup: Some("g1".into()), ..echo() }).unwrap();

        ctl.run(RunOptions::default()).unwrap();
        assert_eq!(
            journal.calls(),
            vec![Call::ExecuteUtil { command: "cgroups_run_into g1 'echo hi'".into() }]
        );
    }

    #[test]
    fn test_as_root_forwarded() {
        let journal = Journal::new();
        let mut ctl = controller(&journal);
        ctl.configure(echo()).unwrap();

        ctl.run(RunOptions::default().as_root()).unwrap();
        assert_eq!(journal.calls(), vec![Call::Execute { command: "echo hi".into(), as_root: true }]);
    }

    #[test]
    fn test_background_stays_executing() {
        let journal = Journal::new();
        let mut ctl = controller(&journal);
        ctl.configure(echo()).unwrap();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        ctl.set_callback(Step::PostRun, move |_: &CallbackArgs<'_>| counter.set(counter.get() + 1));

        let outcome = ctl.run(RunOptions::default().in_background()).unwrap();
        assert!(outcome.is_detached());
        assert_eq!(outcome.output(), "");
        assert_eq!(ctl.state(), RunState::Executing);
        assert_eq!(ctl.output(), Some(""));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_composed_command_cached_until_reconfigured() {
        let journal = Journal::new();
        let mut ctl = controller(&journal);
        ctl.configure(WorkloadDefinition { cpus: Some(vec![1]), ..echo() }).unwrap();
        let first = ctl.composed_command().unwrap();
        assert_eq!(first, ctl.composed_command().unwrap());

        ctl.configure(WorkloadDefinition { cpus: Some(vec![2]), ..echo() }).unwrap();
        let second = ctl.composed_command().unwrap();
        assert_eq!(second.as_str(), "/data/local/tmp/bin/taskset 0x4 echo hi");
    }

    #[test]
    fn test_repeated_runs_do_not_stack_prefixes() {
        let journal = Journal::new();
        let mut ctl = controller(&journal);
        ctl.configure(WorkloadDefinition { cpus: Some(vec![0]), cgroup: Some("g".into()), ..echo() })
            .unwrap();
        ctl.run(RunOptions::default()).unwrap();
        ctl.run(RunOptions::default()).unwrap();

        let calls = journal.calls();
        assert_eq!(calls[0], calls[1]);
    }

    #[test]
    fn test_cpus_mask_defaults_to_online() {
        let journal = Journal::new();
        let ctl = ExecutionController::new(
            MockTarget::new(journal.clone()).with_online_cpus(vec![CpuId(0), CpuId(1)]),
        );
        assert_eq!(ctl.cpus_mask(None).unwrap(), CpuMask(0b11));
        assert_eq!(ctl.cpus_mask(Some(&[CpuId(3)])).unwrap(), CpuMask(0b1000));
    }

    #[test]
    fn test_profile_tasks_tracked_on_configure() {
        let journal = Journal::new();
        let mut ctl = controller(&journal);
        ctl.configure(WorkloadDefinition {
            kind: "profile".into(),
            params: serde_json::json!({"task_a": {}, "task_b": {}}),
            ..echo()
        })
        .unwrap();

        let mut table = ProcessTable::new(["comm", "pid"]);
        table.push_row(["task_a", "42"]);
        let tasks = ctl.resolve_tasks(Some(&table), None).unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks["task_b"].is_empty());
        assert_eq!(tasks["task_a"].len(), 1);
    }

    #[test]
    fn test_instances_without_executor() {
        let journal = Journal::new();
        let mut ctl = controller(&journal);
        ctl.configure(echo()).unwrap();
        assert!(ctl.kill_all().unwrap().is_empty());
        assert!(journal.calls().is_empty());
    }
}
