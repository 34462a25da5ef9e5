//! Environment-based configuration.
//!
//! Options can be overridden with `VIGIL_`-prefixed environment variables,
//! optionally loaded from a `.env` file:
//!
//! | variable | values |
//! |---|---|
//! | `VIGIL_VALIDATION_TRIGGER` | `immediate`, `auto`, `manual`, `autoAfterManual` |
//! | `VIGIL_EXCEPTION_HANDLING` | `succeedValidation`, `failValidation` |
//! | `VIGIL_STALE_RESULTS` | `lastCompleted`, `lastIssued` |
//! | `VIGIL_EXCLUDED_FIELDS` | comma separated regular expressions |

use crate::error::{Error, Result};
use crate::options::{Options, PartialOptions};
use std::path::PathBuf;

/// Prefix of all configuration variables.
pub const ENV_PREFIX: &str = "VIGIL_";

/// Load a `.env` file from the current directory or its ancestors.
///
/// Returns the path of the loaded file; a missing file is not an error.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

impl PartialOptions {
    /// Read overrides from the environment.
    pub fn from_env() -> Result<Self> {
        envy::prefixed(ENV_PREFIX)
            .from_env::<PartialOptions>()
            .map_err(|e| Error::Config(e.to_string()))
    }
}

impl Options {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self> {
        Ok(Options::default().merged(PartialOptions::from_env()?))
    }
}
