//! Result shapes produced by validation: statuses, field results and the
//! flattened result of a validation pass.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Validation status of a node or rule result.
///
/// Serialized as a lowercase string. Unknown strings are kept as
/// [`Status::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Error,
    Warning,
    Success,
    Custom(String),
}

impl Status {
    /// Get the status name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Status::Error => "error",
            Status::Warning => "warning",
            Status::Success => "success",
            Status::Custom(name) => name,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success)
    }

    /// Ordering used when folding results: error > warning > custom > success.
    pub fn severity(&self) -> u8 {
        match self {
            Status::Error => 3,
            Status::Warning => 2,
            Status::Custom(_) => 1,
            Status::Success => 0,
        }
    }

    /// Return the more severe of two statuses.
    pub fn worse(self, other: Status) -> Status {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

impl From<&str> for Status {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => Status::Error,
            "warning" => Status::Warning,
            "success" => Status::Success,
            _ => Status::Custom(s.to_string()),
        }
    }
}

impl From<String> for Status {
    fn from(s: String) -> Self {
        Status::from(s.as_str())
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of validating a single field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldResult {
    /// Dotted path of the field within the wrapped model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    /// Human-readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Named bucket used to present messages of several fields together
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl FieldResult {
    pub fn new(status: Status, text: impl Into<String>) -> Self {
        Self {
            path: None,
            status: Some(status),
            text: Some(text.into()),
            group: None,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Status::Error, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(Status::Warning, text)
    }

    pub fn success() -> Self {
        Self {
            status: Some(Status::Success),
            ..Self::default()
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// A result is successful when its status is unset or `success`.
    pub fn is_success(&self) -> bool {
        self.status.as_ref().map_or(true, Status::is_success)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.status, Some(Status::Error))
    }

    pub fn is_warning(&self) -> bool {
        matches!(self.status, Some(Status::Warning))
    }
}

/// Flattened result of a field or object validation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Non-success field results
    pub results: Vec<FieldResult>,
    pub has_errors: bool,
    pub has_warnings: bool,
    /// Texts of all results joined with `|`, used to detect changed warnings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_hash: Option<String>,
}

impl ValidationResult {
    /// A neutral, successful result.
    pub fn success() -> Self {
        Self::default()
    }

    /// Result of a single field. Successful field results yield [`success`](Self::success).
    pub fn from_field(result: FieldResult) -> Self {
        if result.is_success() {
            return Self::success();
        }

        let has_warnings = result.is_warning();
        let warning_hash = if has_warnings {
            result.text.clone()
        } else {
            None
        };

        Self {
            has_errors: result.is_error(),
            has_warnings,
            warning_hash,
            results: vec![result],
        }
    }

    /// Flatten several results into one.
    pub fn merge(results: impl IntoIterator<Item = ValidationResult>) -> Self {
        let results: Vec<FieldResult> = results.into_iter().flat_map(|r| r.results).collect();
        let has_errors = results.iter().any(FieldResult::is_error);
        let has_warnings = results.iter().any(FieldResult::is_warning);
        let warning_hash = if results.is_empty() {
            None
        } else {
            Some(
                results
                    .iter()
                    .map(|r| r.text.as_deref().unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join("|"),
            )
        };

        Self {
            results,
            has_errors,
            has_warnings,
            warning_hash,
        }
    }

    /// Whether every contained field result is successful.
    pub fn is_success(&self) -> bool {
        self.results.iter().all(FieldResult::is_success)
    }

    /// The worst status among the contained results.
    pub fn status(&self) -> Status {
        self.results
            .iter()
            .filter_map(|r| r.status.clone())
            .fold(Status::Success, Status::worse)
    }

    /// Find the result for a field path.
    pub fn get(&self, path: &str) -> Option<&FieldResult> {
        self.results.iter().find(|r| r.path.as_deref() == Some(path))
    }
}
