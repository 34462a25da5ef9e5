//! Validation sessions.
//!
//! A session binds a rule set, options and hooks to one or more wrapped
//! models. It decides whether a field mutation validates (the trigger gate),
//! runs disablers and validators, cascades into related fields and keeps the
//! results table that presentation layers read.

mod engine;
mod results;

pub use engine::VALIDATION_FAILED;
pub use results::SessionResults;

use crate::error::{Error, Result, RuleError, TransportError};
use crate::group::GroupResult;
use crate::hooks::{append_query, Hooks};
use crate::model::{Model, Wrappable};
use crate::node::NodeState;
use crate::options::{ExclusionSet, Options, ValidationTrigger};
use crate::registry::RuleSetRegistry;
use crate::result::FieldResult;
use crate::rules::{RemoteCheck, RuleSet};
use crate::sync::{lock, read, write};
use http::Method;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock, Weak};

#[derive(Debug, Default)]
struct SessionState {
    depth: usize,
    initializing: usize,
    triggered: bool,
}

pub(crate) struct SessionInner {
    rule_set: Arc<RuleSet>,
    options: Options,
    exclusions: ExclusionSet,
    hooks: Hooks,
    state: Mutex<SessionState>,
    results: RwLock<SessionResults>,
}

/// A validation session. Cloning yields a handle to the same session.
#[derive(Clone)]
pub struct ValidationSession {
    inner: Arc<SessionInner>,
}

/// Non-owning session handle held by nodes.
#[derive(Clone, Default)]
pub(crate) struct SessionRef(Weak<SessionInner>);

impl SessionRef {
    pub(crate) fn upgrade(&self) -> Option<ValidationSession> {
        self.0.upgrade().map(|inner| ValidationSession { inner })
    }
}

enum RuleSetSource {
    Missing,
    Ready(Arc<RuleSet>),
    Unresolved(String),
}

/// Builder for [`ValidationSession`].
pub struct SessionBuilder {
    rule_set: RuleSetSource,
    options: Options,
    hooks: Hooks,
}

impl SessionBuilder {
    pub fn rule_set(mut self, rule_set: impl Into<Arc<RuleSet>>) -> Self {
        self.rule_set = RuleSetSource::Ready(rule_set.into());
        self
    }

    /// Resolve the rule set by name. An unknown name fails at [`build`](Self::build).
    pub fn rule_set_named(mut self, name: &str, registry: &RuleSetRegistry) -> Self {
        self.rule_set = match registry.resolve(name) {
            Some(rule_set) => RuleSetSource::Ready(rule_set),
            None => RuleSetSource::Unresolved(name.to_string()),
        };
        self
    }

    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn build(self) -> Result<ValidationSession> {
        let rule_set = match self.rule_set {
            RuleSetSource::Ready(rule_set) => rule_set,
            RuleSetSource::Unresolved(name) => return Err(Error::RuleSetNotFound(name)),
            RuleSetSource::Missing => {
                return Err(Error::Config("a rule set or rule set name is required".into()))
            }
        };
        if rule_set.uses_remote() && !self.hooks.has_transport() {
            return Err(Error::MissingHook("call_server"));
        }
        let exclusions = ExclusionSet::compile(&self.options.excluded_fields)?;

        tracing::debug!(
            trigger = ?self.options.validation_trigger,
            exception_handling = ?self.options.exception_handling,
            "validation session created"
        );

        Ok(ValidationSession {
            inner: Arc::new(SessionInner {
                rule_set,
                options: self.options,
                exclusions,
                hooks: self.hooks,
                state: Mutex::new(SessionState::default()),
                results: RwLock::new(SessionResults::default()),
            }),
        })
    }
}

impl ValidationSession {
    pub fn builder() -> SessionBuilder {
        SessionBuilder {
            rule_set: RuleSetSource::Missing,
            options: Options::default(),
            hooks: Hooks::default(),
        }
    }

    /// Create a session with default hooks.
    pub fn new(rule_set: impl Into<Arc<RuleSet>>, options: Options) -> Result<Self> {
        Self::builder().rule_set(rule_set).options(options).build()
    }

    pub(crate) fn downgrade(&self) -> SessionRef {
        SessionRef(Arc::downgrade(&self.inner))
    }

    pub fn ptr_eq(&self, other: &ValidationSession) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn rule_set(&self) -> &Arc<RuleSet> {
        &self.inner.rule_set
    }

    pub fn options(&self) -> &Options {
        &self.inner.options
    }

    /// The opaque parameters of the rule set.
    pub fn parameters(&self) -> &Value {
        self.inner.rule_set.parameters()
    }

    pub fn is_excluded(&self, field: &str) -> bool {
        self.inner.exclusions.is_excluded(field)
    }

    /// Whether an explicit validation has happened in this session.
    pub fn is_triggered(&self) -> bool {
        lock(&self.inner.state).triggered
    }

    /// Whether an explicit validation is running.
    pub fn is_validating(&self) -> bool {
        lock(&self.inner.state).depth > 0
    }

    /// Wrap a value with this session.
    pub async fn wrap(&self, value: impl Into<Wrappable>) -> Result<Model> {
        Model::wrap(value, self).await
    }

    /// Snapshot of the results table.
    pub fn results(&self) -> SessionResults {
        read(&self.inner.results).clone()
    }

    pub fn field_result(&self, path: &str) -> Option<FieldResult> {
        read(&self.inner.results).field(path).cloned()
    }

    pub fn group(&self, name: &str) -> Option<GroupResult> {
        read(&self.inner.results).group(name).cloned()
    }

    pub fn groups(&self) -> Vec<GroupResult> {
        read(&self.inner.results).groups.values().cloned().collect()
    }

    /// Call the server through the configured transport.
    ///
    /// For `GET` the payload is moved into the query string.
    pub async fn call_server(
        &self,
        url: &str,
        method: Method,
        payload: Option<Value>,
    ) -> Result<Value, RuleError> {
        let transport = self
            .inner
            .hooks
            .get_transport()
            .ok_or(TransportError::Unavailable)?;

        let (url, payload) = if method == Method::GET {
            let url = payload
                .as_ref()
                .map(|p| append_query(url, p))
                .unwrap_or_else(|| url.to_string());
            (url, None)
        } else {
            (url.to_string(), payload)
        };

        tracing::trace!(url = %url, method = %method, "calling server");
        Ok(transport.call(&url, method, payload).await?)
    }

    /// Post-process a raw remote response.
    pub async fn handle_result(
        &self,
        model: &Model,
        field: &str,
        rule: &RemoteCheck,
        response: Value,
    ) -> Result<Value, RuleError> {
        self.inner
            .hooks
            .get_result_handler()
            .handle(self, model, field, rule, response)
            .await
    }

    /// Convert a date string into a comparable timestamp in milliseconds.
    pub fn value_of_date(&self, date: &str, locale: &str, format: &str) -> Option<i64> {
        self.inner.hooks.get_date_parser().value_of(date, locale, format)
    }

    /// Record a field state in the results table and notify the observer.
    pub(crate) fn publish(&self, path: &str, state: &NodeState) {
        write(&self.inner.results).record(path, state.to_result(path));
        self.notify(path, state);
    }

    /// Drop a field, or a whole subtree, from the results table.
    pub(crate) fn forget(&self, path: &str) {
        write(&self.inner.results).remove(path);
    }

    pub(crate) fn notify(&self, path: &str, state: &NodeState) {
        if let Some(observer) = self.inner.hooks.get_observer() {
            observer.state_changed(path, state);
        }
    }

    /// Raise the initializing flag for the lifetime of the guard.
    pub(crate) fn initializing(&self) -> Initializing<'_> {
        lock(&self.inner.state).initializing += 1;
        Initializing { inner: &self.inner }
    }

    fn gate_open(&self) -> bool {
        let state = lock(&self.inner.state);
        match self.inner.options.validation_trigger {
            ValidationTrigger::Immediate => true,
            ValidationTrigger::Auto => state.initializing == 0,
            ValidationTrigger::Manual => state.depth > 0,
            ValidationTrigger::AutoAfterManual => state.triggered || state.depth > 0,
        }
    }
}

impl fmt::Debug for ValidationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationSession")
            .field("options", &self.inner.options)
            .field("state", &*lock(&self.inner.state))
            .field("hooks", &self.inner.hooks)
            .finish()
    }
}

pub(crate) struct Initializing<'a> {
    inner: &'a SessionInner,
}

impl Drop for Initializing<'_> {
    fn drop(&mut self) {
        let mut state = lock(&self.inner.state);
        state.initializing = state.initializing.saturating_sub(1);
    }
}

/// Marks an explicit validation: raises the depth counter and the triggered flag.
struct Explicit<'a> {
    inner: &'a SessionInner,
}

impl<'a> Explicit<'a> {
    fn enter(inner: &'a SessionInner) -> Self {
        let mut state = lock(&inner.state);
        state.depth += 1;
        state.triggered = true;
        drop(state);
        Self { inner }
    }
}

impl Drop for Explicit<'_> {
    fn drop(&mut self) {
        let mut state = lock(&self.inner.state);
        state.depth = state.depth.saturating_sub(1);
    }
}
