//! # Vigil
//!
//! Live validation for editable data graphs.
//!
//! Vigil wraps a plain JSON model in a shadow graph of validatable nodes.
//! Every field write may trigger the field's rules, depending on the
//! session's trigger policy, and every node reports its own status, message
//! and group so that a form can show validity while the user types.
//!
//! ## Quick Start
//!
//! ```rust
//! use vigil::prelude::*;
//! use vigil::serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> vigil::Result<()> {
//! let rules = RuleSet::new()
//!     .validator(
//!         "email",
//!         Rule::from_fn(|model, _| {
//!             Ok(match model.get_str("email") {
//!                 Some(email) if email.contains('@') => RuleOutput::Pass,
//!                 _ => RuleOutput::message("Not an email address"),
//!             })
//!         }),
//!     );
//!
//! let session = ValidationSession::new(rules, Options::default())?;
//! let form = session.wrap(json!({ "email": "ada" })).await?;
//!
//! let result = form.validate().await?;
//! assert_eq!(result.results[0].text.as_deref(), Some("Not an email address"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Optional Features
//!
//! - `http` (default) - [`HttpTransport`] for remote rules and [`default_hooks`]
//! - `config` (default) - [`Options::from_env`] and [`session_from_env`]
//! - `test-utils` - `MockTransport` and `RecordingObserver` doubles
//! - `full` - all of the above

// Re-export the engine
pub use vigil_core::*;

// Re-export the HTTP transport (feature-gated)
#[cfg(feature = "http")]
pub use vigil_remote::{HttpTransport, HttpTransportBuilder};

// Re-export serde_json for building models
pub use serde_json;

/// Hooks for a production session.
///
/// With the `http` feature, remote rules are sent through a default
/// [`HttpTransport`]; otherwise no transport is configured and sessions
/// using remote rules fail to build.
pub fn default_hooks() -> Hooks {
    #[cfg(feature = "http")]
    {
        Hooks::new().transport(HttpTransport::new())
    }
    #[cfg(not(feature = "http"))]
    {
        Hooks::new()
    }
}

/// Build a session configured from the environment.
///
/// Loads `.env` if present, applies `VIGIL_*` overrides to the default
/// options and installs [`default_hooks`].
#[cfg(feature = "config")]
pub fn session_from_env(rule_set: impl Into<std::sync::Arc<RuleSet>>) -> Result<ValidationSession> {
    if let Some(path) = config::load_dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env file");
    }
    let options = Options::from_env()?;

    ValidationSession::builder()
        .rule_set(rule_set)
        .options(options)
        .hooks(default_hooks())
        .build()
}

/// Prelude module - import everything you need with `use vigil::prelude::*`
pub mod prelude {
    pub use vigil_core::prelude::*;

    pub use vigil_core::{
        GroupResult, RuleSetRegistry, StaleResultPolicy, Transaction, Wrappable,
        VALIDATABLE_ACCESSOR,
    };

    #[cfg(feature = "http")]
    pub use vigil_remote::HttpTransport;

    pub use crate::default_hooks;
}
