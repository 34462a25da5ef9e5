//! Rule evaluation.
//!
//! Every public entry point starts a validation chain. The chain remembers
//! which field paths it has processed so that a related-field cascade
//! (A validates B, whose rule names A again) terminates. Related fields are
//! awaited within the same chain, so cascades always run in rule order.

use super::{Explicit, ValidationSession};
use crate::error::{Error, Result, RuleError};
use crate::model::Model;
use crate::node::{NodeState, ObjectNode, Validatable, ValueNode};
use crate::options::{ExceptionHandling, StaleResultPolicy};
use crate::result::{FieldResult, Status, ValidationResult};
use crate::rules::RuleOutput;
use crate::sync::lock;
use futures_util::future::{join_all, BoxFuture};
use futures_util::FutureExt;
use std::any::Any;
use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, trace, warn, Instrument};

/// Text of the result produced for a failing rule under
/// [`ExceptionHandling::FailValidation`].
pub const VALIDATION_FAILED: &str = "Validation failed.";

#[derive(Default)]
struct Chain {
    processed: Mutex<HashSet<String>>,
}

impl Chain {
    /// Mark a path as processed. Returns `false` when it already was.
    fn claim(&self, path: &str) -> bool {
        lock(&self.processed).insert(path.to_string())
    }
}

impl ValidationSession {
    /// Validate every field of an object node and its descendants.
    ///
    /// Counts as an explicit validation for the trigger gate. Fields that
    /// were never read are materialized first.
    #[tracing::instrument(level = "debug", skip_all, fields(path = %node.path()))]
    pub async fn validate_object(&self, node: &Arc<ObjectNode>) -> Result<ValidationResult> {
        let _explicit = Explicit::enter(&self.inner);
        let chain = Chain::default();
        self.object_in_chain(node.clone(), &chain).await
    }

    /// Validate a single field if the trigger gate allows it.
    ///
    /// `model` overrides the root model passed to rules; by default the
    /// root of the node's graph is used.
    pub async fn validate_field(
        &self,
        node: &Arc<ValueNode>,
        model: Option<&Model>,
    ) -> Result<ValidationResult> {
        let chain = Chain::default();
        self.field_in_chain(node.clone(), model.cloned(), &chain).await
    }

    /// Validate a single field as an explicit call.
    pub(crate) async fn validate_explicitly(&self, node: &Arc<ValueNode>) -> Result<ValidationResult> {
        let _explicit = Explicit::enter(&self.inner);
        self.validate_field(node, None).await
    }

    fn object_in_chain<'a>(
        &'a self,
        node: Arc<ObjectNode>,
        chain: &'a Chain,
    ) -> BoxFuture<'a, Result<ValidationResult>> {
        let span = tracing::debug_span!("object", path = %node.path());
        Box::pin(
            async move {
                if let Some(model) = node.model() {
                    model.materialize();
                }

                let pending = node
                    .children()
                    .into_iter()
                    .filter(|(name, _)| !self.is_excluded(name))
                    .map(move |(_, child)| match child {
                        Validatable::Value(value) => self.field_in_chain(value, None, chain),
                        Validatable::Object(object) => self.object_in_chain(object, chain),
                    });
                let results = join_all(pending)
                    .await
                    .into_iter()
                    .collect::<Result<Vec<_>>>()?;

                let result = ValidationResult::merge(results);
                self.notify(&node.path(), &node.state());
                Ok(result)
            }
            .instrument(span),
        )
    }

    fn field_in_chain<'a>(
        &'a self,
        node: Arc<ValueNode>,
        model: Option<Model>,
        chain: &'a Chain,
    ) -> BoxFuture<'a, Result<ValidationResult>> {
        Box::pin(async move {
            let path = node.path();
            if !self.gate_open() {
                debug!(path = %path, trigger = ?self.inner.options.validation_trigger, "validation gated");
                return Ok(ValidationResult::success());
            }
            if !chain.claim(&path) {
                debug!(path = %path, "field already validated in this chain");
                return Ok(ValidationResult::success());
            }

            let model = match model {
                Some(model) => model,
                None => node.root_model().ok_or_else(|| Error::Detached(path.clone()))?,
            };

            let ticket = node.begin();
            let outcome = self.run_rules(&node, &path, &model, chain).await;

            if self.inner.options.stale_results == StaleResultPolicy::LastIssued && !node.is_latest(ticket) {
                debug!(path = %path, "discarding stale validation result");
                return Ok(ValidationResult::success());
            }

            let result = outcome.unwrap_or_else(FieldResult::success).with_path(path.as_str());
            let state = NodeState::from(&result);
            node.set_state(state.clone());
            self.publish(&path, &state);

            Ok(ValidationResult::from_field(result))
        })
    }

    /// Evaluate disablers and validators. `None` means the field is valid.
    async fn run_rules(
        &self,
        node: &ValueNode,
        path: &str,
        model: &Model,
        chain: &Chain,
    ) -> Option<FieldResult> {
        let field = node.field();
        let rule_set = self.inner.rule_set.clone();
        let rules = rule_set.validators_for(path, field);
        if rules.is_empty() {
            return None;
        }

        match self.is_disabled(path, field, model).await {
            Ok(true) => {
                trace!(path, "validation disabled");
                return None;
            }
            Ok(false) => {}
            Err(error) => return self.rule_failed(field, path, error),
        }

        for rule in rules {
            for related in rule.related() {
                self.validate_related(related, model, chain).await;
            }

            trace!(path, "running rule");
            match guarded(rule.check(model, self)).await {
                Ok(RuleOutput::Pass) => {}
                Ok(RuleOutput::Message(text)) if text.is_empty() => {}
                Ok(RuleOutput::Message(text)) => {
                    let mut result = FieldResult::error(text);
                    result.group = rule.group().map(str::to_string);
                    return Some(result);
                }
                Ok(RuleOutput::Result(result)) if result.status == Some(Status::Success) => {}
                Ok(RuleOutput::Result(mut result)) => {
                    result.status.get_or_insert(Status::Error);
                    if result.group.is_none() {
                        result.group = rule.group().map(str::to_string);
                    }
                    return Some(result);
                }
                Err(error) => return self.rule_failed(field, path, error),
            }
        }

        None
    }

    async fn is_disabled(&self, path: &str, field: &str, model: &Model) -> Result<bool, RuleError> {
        for disabler in self.inner.rule_set.disablers_for(path, field) {
            if guarded(disabler.check(model, self)).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn validate_related(&self, related: &str, model: &Model, chain: &Chain) {
        let outcome = match model.validatable(related) {
            Some(Validatable::Value(node)) => self.field_in_chain(node, Some(model.clone()), chain).await,
            Some(Validatable::Object(node)) => self.object_in_chain(node, chain).await,
            None => {
                debug!(related, "related field not found");
                return;
            }
        };
        if let Err(error) = outcome {
            warn!(related, error = %error, "related field validation failed");
        }
    }

    fn rule_failed(&self, field: &str, path: &str, error: RuleError) -> Option<FieldResult> {
        error!(field, path, error = %error, "error validating field");
        match self.inner.options.exception_handling {
            ExceptionHandling::FailValidation => Some(FieldResult::error(VALIDATION_FAILED)),
            ExceptionHandling::SucceedValidation => None,
        }
    }
}

/// Run a rule future, turning a panic into a [`RuleError::Panicked`].
async fn guarded<T>(check: impl Future<Output = Result<T, RuleError>>) -> Result<T, RuleError> {
    match AssertUnwindSafe(check).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => Err(RuleError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
