//! # Vigil Core
//!
//! Live validation for editable data graphs. A plain JSON model is wrapped
//! in a [`Model`] whose shadow graph of validatable nodes reports per-field
//! and per-object validity while the model is being edited.
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use vigil_core::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> vigil_core::Result<()> {
//! let rules = RuleSet::new().validator(
//!     "name",
//!     Rule::from_fn(|model, _| {
//!         Ok(match model.get_str("name").as_deref() {
//!             None | Some("") => RuleOutput::message("Name is required"),
//!             _ => RuleOutput::Pass,
//!         })
//!     })
//!     .required(),
//! );
//!
//! let session = ValidationSession::new(rules, Options::default())?;
//! let person = session.wrap(json!({ "name": "" })).await?;
//!
//! let result = person.validate().await?;
//! assert!(result.has_errors);
//!
//! // After the first explicit validation, edits validate automatically.
//! person.set("name", "Ada").await?;
//! assert!(person.is_valid());
//! # Ok(())
//! # }
//! ```
//!
//! ## Trigger policies
//!
//! | policy | a field write validates... |
//! |---|---|
//! | `Immediate` | always |
//! | `Auto` | except during the population pass of `wrap` |
//! | `Manual` | never; only explicit `validate` calls do |
//! | `AutoAfterManual` (default) | once an explicit validation has happened |
//!
//! ## Features
//!
//! - `config` - load [`Options`] from `VIGIL_*` environment variables
//! - `test-utils` - in-memory transport and observer doubles

#[cfg(feature = "config")]
pub mod config;
mod error;
pub mod group;
pub mod hooks;
mod model;
mod node;
pub mod options;
pub mod path;
mod registry;
mod result;
pub mod rules;
pub mod server;
mod session;
mod sync;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
mod transaction;

use std::sync::Arc;

pub use error::{Error, Result, RuleError, TransportError};
pub use group::{aggregate_groups, GroupMessages, GroupResult};
pub use hooks::{ChronoDateParser, DateParser, Hooks, NodeObserver, PassThrough, RemoteTransport, ResultHandler};
pub use model::{Field, Model, ModelFn, Wrappable, VALIDATABLE_ACCESSOR};
pub use node::{NodeState, ObjectNode, Validatable, ValueNode};
pub use options::{ExceptionHandling, Options, PartialOptions, StaleResultPolicy, ValidationTrigger};
pub use registry::{RuleSetRegistry, RuleSetResolver, StaticResolver};
pub use result::{FieldResult, Status, ValidationResult};
pub use rules::{Disabler, RemoteCheck, Rule, RuleOutput, RuleSet};
pub use server::ServerResponse;
pub use session::{SessionBuilder, SessionResults, ValidationSession, VALIDATION_FAILED};
pub use transaction::Transaction;

/// Wrap a model with a fresh session using default hooks.
pub async fn wrap(value: serde_json::Value, rule_set: impl Into<Arc<RuleSet>>, options: Options) -> Result<Model> {
    let session = ValidationSession::new(rule_set, options)?;
    Model::wrap(value, &session).await
}

/// Prelude module for validation
pub mod prelude {
    pub use crate::error::{Error, RuleError};
    pub use crate::hooks::Hooks;
    pub use crate::model::{Field, Model};
    pub use crate::node::{ObjectNode, Validatable, ValueNode};
    pub use crate::options::{ExceptionHandling, Options, ValidationTrigger};
    pub use crate::result::{FieldResult, Status, ValidationResult};
    pub use crate::rules::{Disabler, RemoteCheck, Rule, RuleOutput, RuleSet};
    pub use crate::server::ServerResponse;
    pub use crate::session::ValidationSession;
}
