//! Lifecycle callbacks
//!
//! A closed set of [`Step`]s, each with at most one handler. Step names
//! coming from strings are validated when parsed, so an unknown step is
//! rejected before anything is registered or invoked.

use log::debug;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::domain::ConfigError;

/// Lifecycle moments exposing a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {
    /// After a foreground run completed and its trace was pulled
    PostRun,
}

impl Step {
    pub const ALL: [Step; 1] = [Step::PostRun];

    pub fn name(self) -> &'static str {
        match self {
            Step::PostRun => "postrun",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Step {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Step::ALL
            .into_iter()
            .find(|step| step.name() == s)
            .ok_or_else(|| ConfigError::UnknownStep(s.to_string()))
    }
}

/// Arguments handed to a callback.
#[derive(Debug, Clone, Copy)]
pub struct CallbackArgs<'a> {
    /// Output folder of the run
    pub destdir: &'a Path,
}

pub type Callback = Box<dyn FnMut(&CallbackArgs<'_>)>;

/// One optional handler per [`Step`].
pub struct CallbackRegistry {
    handlers: BTreeMap<Step, Option<Callback>>,
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self { handlers: Step::ALL.into_iter().map(|step| (step, None)).collect() }
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.handlers.iter().map(|(step, handler)| (step, handler.is_some())))
            .finish()
    }
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler` for `step`, replacing any previous one
    pub fn register(&mut self, step: Step, handler: impl FnMut(&CallbackArgs<'_>) + 'static) {
        debug!("Setup step [{step}] callback");
        self.handlers.insert(step, Some(Box::new(handler)));
    }

    /// Install `handler` for the step named `step`.
    ///
    /// # Errors
    /// Returns [`ConfigError::UnknownStep`] for names outside [`Step::ALL`]
    pub fn register_named(
        &mut self,
        step: &str,
        handler: impl FnMut(&CallbackArgs<'_>) + 'static,
    ) -> Result<(), ConfigError> {
        let step: Step = step.parse()?;
        self.register(step, handler);
        Ok(())
    }

    /// Remove the handler of `step`
    pub fn clear(&mut self, step: Step) {
        self.handlers.insert(step, None);
    }

    pub fn is_set(&self, step: Step) -> bool {
        self.handlers.get(&step).is_some_and(Option::is_some)
    }

    /// Run the handler of `step`. Returns false when none is installed.
    pub fn invoke(&mut self, step: Step, args: &CallbackArgs<'_>) -> bool {
        let Some(Some(handler)) = self.handlers.get_mut(&step) else {
            return false;
        };
        debug!("Callback [{step}]...");
        handler(args);
        true
    }

    /// Run the handler of the step named `step`.
    ///
    /// # Errors
    /// Returns [`ConfigError::UnknownStep`] for names outside [`Step::ALL`];
    /// no handler runs in that case
    pub fn invoke_named(&mut self, step: &str, args: &CallbackArgs<'_>) -> Result<bool, ConfigError> {
        let step: Step = step.parse()?;
        Ok(self.invoke(step, args))
    }
}
