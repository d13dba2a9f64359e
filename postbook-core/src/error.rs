//! Error types for postbook-core.

use thiserror::Error;

/// Errors raised while reading process configuration.
///
/// Every variant is fatal: the process exits before any I/O.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is unset or empty.
    #[error("No {var} env variable. Perhaps you forgot to add it?")]
    Missing { var: &'static str },

    /// A setting is present but cannot be used.
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}
