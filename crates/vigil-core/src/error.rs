//! Error types for the validation engine.
//!
//! [`Error`] covers configuration and structural failures and always surfaces
//! to the caller, while [`RuleError`] is what a rule reports when it fails to
//! execute. Rule errors are handled by the session according to the
//! configured [`ExceptionHandling`](crate::ExceptionHandling) policy and never
//! escape it.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Configuration and structural errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Wrapping `null` has no meaningful shadow graph.
    #[error("The model cannot be null or undefined")]
    NullModel,

    /// Only objects and arrays can be wrapped.
    #[error("Cannot wrap a {0} value, only objects and arrays are validatable")]
    NotComposite(&'static str),

    /// The reserved validatable accessor cannot be assigned.
    #[error("The {0} property is read-only")]
    ReadOnly(String),

    /// The node is not connected to a live session.
    #[error("No validation session found for '{0}'")]
    NoSession(String),

    /// The node's owning model has been dropped.
    #[error("The model owning '{0}' is no longer available")]
    Detached(String),

    /// A collaborator hook required by the rule set is not configured.
    #[error("The {0} hook is required")]
    MissingHook(&'static str),

    /// No resolver knows the requested rule set.
    #[error("Could not find a validation rule set with the name '{0}'")]
    RuleSetNotFound(String),

    /// A wrapped model belongs to another session.
    #[error("The model is already bound to a different validation session")]
    SessionMismatch,

    /// A path does not lead to an object that can hold the field.
    #[error("Path '{0}' does not resolve to an object")]
    InvalidPath(String),

    /// An exclusion pattern failed to compile.
    #[error("Invalid exclusion pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failure raised while executing a validator or disabler.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The remote check transport failed.
    #[error("Remote call failed: {0}")]
    Transport(#[from] TransportError),

    /// A response did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Any other rule failure.
    #[error("{0}")]
    Failed(String),

    /// The rule panicked while running.
    #[error("Rule panicked: {0}")]
    Panicked(String),
}

impl RuleError {
    /// Create a generic rule failure.
    pub fn new(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Errors raised by a [`RemoteTransport`](crate::RemoteTransport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The request could not be sent or the response not read.
    #[error("Network error: {0}")]
    Network(String),

    /// The response body was not valid JSON.
    #[error("Invalid response body: {0}")]
    Body(String),

    /// No transport is configured for the session.
    #[error("No remote transport configured")]
    Unavailable,
}
