//! Rule sets: validators and disablers keyed by field.
//!
//! A [`RuleSet`] maps a field path (or a bare field name) to an ordered list
//! of [`Rule`]s and [`Disabler`]s. Rules are evaluated in order and the first
//! failing rule decides the field's result.
//!
//! ```
//! use vigil_core::rules::{Rule, RuleOutput, RuleSet};
//!
//! let rules = RuleSet::new().validator(
//!     "name",
//!     Rule::from_fn(|model, _session| {
//!         Ok(match model.get_str("name") {
//!             Some(name) if !name.is_empty() => RuleOutput::Pass,
//!             _ => RuleOutput::message("Name is required"),
//!         })
//!     })
//!     .required(),
//! );
//!
//! assert!(rules.is_required("name", "name"));
//! ```

mod check;
mod remote;

pub use check::{AsyncFn, Check, SyncFn};
pub use remote::{error_message, RemoteCheck};

use crate::error::RuleError;
use crate::model::Model;
use crate::result::{FieldResult, Status};
use crate::session::ValidationSession;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// What a validator reports.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutput {
    /// The field is valid; evaluation continues with the next rule.
    Pass,
    /// An error message. An empty message counts as a pass.
    Message(String),
    /// A structured result. A success status counts as a pass.
    Result(FieldResult),
}

impl RuleOutput {
    pub fn message(text: impl Into<String>) -> Self {
        RuleOutput::Message(text.into())
    }

    pub fn warning(text: impl Into<String>) -> Self {
        RuleOutput::Result(FieldResult::warning(text))
    }

    /// Whether evaluation moves on to the next rule.
    pub fn is_pass(&self) -> bool {
        match self {
            RuleOutput::Pass => true,
            RuleOutput::Message(text) => text.is_empty(),
            RuleOutput::Result(result) => matches!(result.status, Some(Status::Success)),
        }
    }
}

impl From<Option<String>> for RuleOutput {
    fn from(message: Option<String>) -> Self {
        message.map_or(RuleOutput::Pass, RuleOutput::Message)
    }
}

impl From<&str> for RuleOutput {
    fn from(message: &str) -> Self {
        RuleOutput::Message(message.to_string())
    }
}

impl From<String> for RuleOutput {
    fn from(message: String) -> Self {
        RuleOutput::Message(message)
    }
}

impl From<FieldResult> for RuleOutput {
    fn from(result: FieldResult) -> Self {
        RuleOutput::Result(result)
    }
}

/// Free-form rule metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    pub required: bool,
    pub extra: HashMap<String, Value>,
}

/// A single validator.
#[derive(Clone)]
pub struct Rule {
    check: Arc<dyn Check<RuleOutput>>,
    annotations: Annotations,
    related: Vec<String>,
    group: Option<String>,
    remote: bool,
}

impl Rule {
    pub fn new(check: impl Check<RuleOutput> + 'static) -> Self {
        Self {
            check: Arc::new(check),
            annotations: Annotations::default(),
            related: Vec::new(),
            group: None,
            remote: false,
        }
    }

    /// Create a rule from a synchronous closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Model, &ValidationSession) -> Result<RuleOutput, RuleError> + Send + Sync + 'static,
    {
        Self::new(SyncFn(f))
    }

    /// Create a rule from an async closure.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Model, ValidationSession) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RuleOutput, RuleError>> + Send + 'static,
    {
        Self::new(AsyncFn::new(f))
    }

    /// Create a rule that asks the server through the session's transport.
    pub fn remote(check: RemoteCheck) -> Self {
        Self {
            remote: true,
            ..Self::new(check)
        }
    }

    /// Mark the field as required.
    pub fn required(mut self) -> Self {
        self.annotations.required = true;
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.annotations.extra.insert(key.into(), value.into());
        self
    }

    /// Fields validated before this rule runs, as root-relative paths.
    pub fn with_related<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.related.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Group for messages produced by this rule.
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn is_required(&self) -> bool {
        self.annotations.required
    }

    pub fn related(&self) -> &[String] {
        &self.related
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn is_remote(&self) -> bool {
        self.remote
    }

    pub async fn check(
        &self,
        model: &Model,
        session: &ValidationSession,
    ) -> Result<RuleOutput, RuleError> {
        self.check.check(model, session).await
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("annotations", &self.annotations)
            .field("related", &self.related)
            .field("group", &self.group)
            .field("remote", &self.remote)
            .finish()
    }
}

/// A predicate that turns validation of a field off. `true` disables.
#[derive(Clone)]
pub struct Disabler {
    check: Arc<dyn Check<bool>>,
}

impl Disabler {
    pub fn new(check: impl Check<bool> + 'static) -> Self {
        Self {
            check: Arc::new(check),
        }
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Model, &ValidationSession) -> Result<bool, RuleError> + Send + Sync + 'static,
    {
        Self::new(SyncFn(f))
    }

    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Model, ValidationSession) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, RuleError>> + Send + 'static,
    {
        Self::new(AsyncFn::new(f))
    }

    pub async fn check(&self, model: &Model, session: &ValidationSession) -> Result<bool, RuleError> {
        self.check.check(model, session).await
    }
}

impl fmt::Debug for Disabler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Disabler")
    }
}

/// Validators, disablers and parameters for one kind of model.
///
/// Lookups try the full field path first, then the bare field name.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    validators: HashMap<String, Vec<Rule>>,
    disablers: HashMap<String, Vec<Disabler>>,
    parameters: Value,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a validator for a field.
    pub fn validator(mut self, field: impl Into<String>, rule: Rule) -> Self {
        self.validators.entry(field.into()).or_default().push(rule);
        self
    }

    /// Append a disabler for a field.
    pub fn disabler(mut self, field: impl Into<String>, disabler: Disabler) -> Self {
        self.disablers.entry(field.into()).or_default().push(disabler);
        self
    }

    /// Opaque parameters exposed to rules through the session.
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn validators_for(&self, path: &str, field: &str) -> &[Rule] {
        self.validators
            .get(path)
            .or_else(|| self.validators.get(field))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn disablers_for(&self, path: &str, field: &str) -> &[Disabler] {
        self.disablers
            .get(path)
            .or_else(|| self.disablers.get(field))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether any validator of the field is annotated as required.
    pub fn is_required(&self, path: &str, field: &str) -> bool {
        self.validators_for(path, field).iter().any(Rule::is_required)
    }

    pub fn parameters(&self) -> &Value {
        &self.parameters
    }

    /// Whether any rule needs a remote transport.
    pub fn uses_remote(&self) -> bool {
        self.validators.values().flatten().any(Rule::is_remote)
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty() && self.disablers.is_empty()
    }

    /// Keys that have validators.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.validators.keys().map(String::as_str)
    }
}
