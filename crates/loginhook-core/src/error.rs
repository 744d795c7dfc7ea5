//! Configuration error types.
//!
//! Every failure in this module is raised before any browser interaction
//! takes place: a contradictory or malformed configuration never reaches
//! the login transaction.

use thiserror::Error;

/// Errors raised while building or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Could not determine the config directory
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// A required option was not supplied
    #[error("missing required option {key}")]
    MissingOption {
        /// Option key, e.g. `auth.loginurl`
        key: String,
    },

    /// An option was supplied with an unusable value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },

    /// An exclusion pattern failed to compile
    #[error("invalid exclusion pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern as supplied
        pattern: String,
        /// Compiler message
        reason: String,
    },

    /// Neither auto-discovery nor a complete explicit field set was configured
    #[error(
        "cannot authenticate: enable auth.auto or set auth.username_field, \
         auth.password_field and auth.submit_field"
    )]
    NoFieldStrategy,

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// I/O error reading config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
