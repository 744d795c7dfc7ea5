//! Error types for the authenticated-session setup.
//!
//! Configuration problems surface as [`ConfigError`] before any browser is
//! started. Once the browser is running, failures are [`SubmissionError`]s
//! (never retried) or [`BridgeError`]s. A cookie that could not be copied is
//! not an error at all: it is reported in [`crate::BridgeResult`].

use crate::engine::EngineError;
use loginhook_browser::BrowserError;
use loginhook_core::ConfigError;
use std::fmt;
use thiserror::Error;

/// Reason code of a failed login submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionFailure {
    /// A navigation or settle wait exceeded its bound
    Timeout,
    /// The login controls could not be resolved on the page
    FieldsNotFound,
    /// No success signal fired after submitting
    LoginNotConfirmed,
}

impl SubmissionFailure {
    /// Stable reason code.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::FieldsNotFound => "fields-not-found",
            Self::LoginNotConfirmed => "login-not-confirmed",
        }
    }
}

impl fmt::Display for SubmissionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Failure of the login transaction.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The login did not go through
    #[error("login failed ({reason}): {detail}")]
    Failed {
        /// Reason code
        reason: SubmissionFailure,
        /// What was being attempted
        detail: String,
    },

    /// The browser driver itself failed
    #[error("browser error: {0}")]
    Browser(BrowserError),
}

impl SubmissionError {
    /// A wait exceeded its bound.
    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::Failed {
            reason: SubmissionFailure::Timeout,
            detail: detail.into(),
        }
    }

    /// Login controls could not be resolved.
    pub fn fields_not_found(detail: impl Into<String>) -> Self {
        Self::Failed {
            reason: SubmissionFailure::FieldsNotFound,
            detail: detail.into(),
        }
    }

    /// Nothing indicated the login succeeded.
    pub fn login_not_confirmed(detail: impl Into<String>) -> Self {
        Self::Failed {
            reason: SubmissionFailure::LoginNotConfirmed,
            detail: detail.into(),
        }
    }

    /// Reason code, if this is a login failure rather than a driver failure.
    #[must_use]
    pub fn reason(&self) -> Option<SubmissionFailure> {
        match self {
            Self::Failed { reason, .. } => Some(*reason),
            Self::Browser(_) => None,
        }
    }
}

impl From<BrowserError> for SubmissionError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::Timeout(detail) => Self::timeout(detail),
            BrowserError::ElementNotFound(detail) => Self::fields_not_found(detail),
            other => Self::Browser(other),
        }
    }
}

/// Failure to hand the browser session over to the engine.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The browser's cookie jar could not be read
    #[error("could not read browser session: {0}")]
    Browser(#[from] BrowserError),

    /// The engine refused to open a session for the site
    #[error("could not open engine session: {0}")]
    Engine(#[from] EngineError),
}

/// Error surfaced to the engine's lifecycle by the hook.
#[derive(Debug, Error)]
pub enum HookError {
    /// Invalid or contradictory configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The browser could not be started
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    /// The login transaction failed
    #[error("{0}")]
    Submission(#[from] SubmissionError),

    /// The session could not be handed to the engine
    #[error("session bridge failed: {0}")]
    Bridge(#[from] BridgeError),

    /// The engine rejected the exclusion filter registration
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}
