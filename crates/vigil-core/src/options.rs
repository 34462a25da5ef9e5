//! Session options.
//!
//! Options are plain configuration: they can be built in code, deserialized
//! from a config file, or loaded from the environment (see [`crate::config`]).
//! Call-site overrides are expressed as [`PartialOptions`] and merged onto a
//! base with [`Options::merged`].

use crate::error::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Field name patterns excluded from materialization by default.
pub const DEFAULT_EXCLUDED_FIELDS: &[&str] =
    &["^_", r"^\$", r"^Symbol\(", "^toJSON$", "^toString"];

/// Governs whether a field mutation runs validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationTrigger {
    /// Every mutation validates.
    Immediate,
    /// Mutations validate once the initial population pass of `wrap` is over.
    Auto,
    /// Only explicit validation calls validate.
    Manual,
    /// Mutations validate once an explicit validation has happened.
    #[default]
    #[serde(alias = "auto_after_manual")]
    AutoAfterManual,
}

/// What happens when a rule fails to execute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExceptionHandling {
    /// Log the failure and keep the field valid.
    #[default]
    #[serde(alias = "succeed_validation")]
    SucceedValidation,
    /// Mark the field as erroneous with a generic message.
    #[serde(alias = "fail_validation")]
    FailValidation,
}

/// Which result wins when asynchronous validations of one field overlap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StaleResultPolicy {
    /// The call that completes last writes the node state.
    #[default]
    #[serde(alias = "last_completed")]
    LastCompleted,
    /// Only the most recently started call may write the node state.
    #[serde(alias = "last_issued")]
    LastIssued,
}

/// Validation session options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    pub validation_trigger: ValidationTrigger,
    pub exception_handling: ExceptionHandling,
    pub stale_results: StaleResultPolicy,
    /// Regular expressions matching field names that are never materialized
    pub excluded_fields: Vec<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            validation_trigger: ValidationTrigger::default(),
            exception_handling: ExceptionHandling::default(),
            stale_results: StaleResultPolicy::default(),
            excluded_fields: DEFAULT_EXCLUDED_FIELDS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validation_trigger(mut self, trigger: ValidationTrigger) -> Self {
        self.validation_trigger = trigger;
        self
    }

    pub fn exception_handling(mut self, handling: ExceptionHandling) -> Self {
        self.exception_handling = handling;
        self
    }

    pub fn stale_results(mut self, policy: StaleResultPolicy) -> Self {
        self.stale_results = policy;
        self
    }

    /// Add an exclusion pattern to the current set.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.excluded_fields.push(pattern.into());
        self
    }

    /// Apply overrides. Fields left unset in `overrides` keep their value.
    pub fn merged(mut self, overrides: PartialOptions) -> Self {
        if let Some(trigger) = overrides.validation_trigger {
            self.validation_trigger = trigger;
        }
        if let Some(handling) = overrides.exception_handling {
            self.exception_handling = handling;
        }
        if let Some(policy) = overrides.stale_results {
            self.stale_results = policy;
        }
        if let Some(excluded) = overrides.excluded_fields {
            self.excluded_fields = excluded;
        }
        self
    }
}

/// Overrides for [`Options`]; unset fields keep the base value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PartialOptions {
    pub validation_trigger: Option<ValidationTrigger>,
    pub exception_handling: Option<ExceptionHandling>,
    pub stale_results: Option<StaleResultPolicy>,
    pub excluded_fields: Option<Vec<String>>,
}

/// Compiled exclusion patterns.
#[derive(Debug, Clone, Default)]
pub(crate) struct ExclusionSet {
    patterns: Vec<Regex>,
}

impl ExclusionSet {
    pub(crate) fn compile(patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub(crate) fn is_excluded(&self, field: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(field))
    }
}
