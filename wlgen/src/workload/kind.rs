//! Workload kinds
//!
//! Each kind tag maps to a constructor validating the kind's parameter
//! payload. The builtin registry knows `profile` and `custom`.

use log::debug;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::domain::ConfigError;

/// Validated, kind-specific parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum KindParams {
    /// Task descriptors keyed by task name
    Profile(BTreeMap<String, Value>),
    /// Opaque payload passed through untouched
    Custom(Value),
}

impl KindParams {
    /// Names of the tasks this workload declares up front
    pub fn task_names(&self) -> Vec<String> {
        match self {
            KindParams::Profile(tasks) => tasks.keys().cloned().collect(),
            KindParams::Custom(_) => Vec::new(),
        }
    }
}

pub type KindConstructor = fn(Value) -> Result<KindParams, ConfigError>;

/// Kind tag → parameter constructor.
#[derive(Debug, Clone, Default)]
pub struct KindRegistry {
    constructors: BTreeMap<String, KindConstructor>,
}

static BUILTIN: OnceLock<KindRegistry> = OnceLock::new();

impl KindRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the builtin kinds
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("profile", profile);
        registry.register("custom", custom);
        registry
    }

    /// Process-wide builtin registry, initialised on first use
    pub fn builtin() -> &'static KindRegistry {
        BUILTIN.get_or_init(Self::with_builtins)
    }

    pub fn register(&mut self, kind: impl Into<String>, constructor: KindConstructor) {
        self.constructors.insert(kind.into(), constructor);
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Validate `params` for `kind`.
    ///
    /// # Errors
    /// Returns [`ConfigError::UnsupportedKind`] for unregistered tags, or the
    /// constructor's own validation error
    pub fn construct(&self, kind: &str, params: Value) -> Result<KindParams, ConfigError> {
        let constructor = self
            .constructors
            .get(kind)
            .ok_or_else(|| ConfigError::UnsupportedKind(kind.to_string()))?;
        debug!("Configuring a {kind}-based workload...");
        constructor(params)
    }
}

fn profile(params: Value) -> Result<KindParams, ConfigError> {
    match params {
        Value::Object(tasks) => Ok(KindParams::Profile(tasks.into_iter().collect())),
        other => Err(ConfigError::InvalidParams {
            kind: "profile".to_string(),
            reason: format!("expected an object of task descriptors, got {other}"),
        }),
    }
}

#[allow(clippy::unnecessary_wraps)]
fn custom(params: Value) -> Result<KindParams, ConfigError> {
    Ok(KindParams::Custom(params))
}
