use loginhook_auth::EngineError;
use thiserror::Error;

/// Result type for ZAP API calls.
pub type Result<T> = std::result::Result<T, ZapError>;

/// Errors talking to the ZAP JSON API.
#[derive(Debug, Error)]
pub enum ZapError {
    /// The request never got an HTTP response
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// ZAP answered with an API error
    #[error("ZAP API error ({status}, {code}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// ZAP error code, e.g. `already_exists`
        code: String,
        /// Human-readable message
        message: String,
    },

    /// The response body was not what the API documents
    #[error("unexpected ZAP response: {0}")]
    UnexpectedResponse(String),

    /// The configured API URL cannot be used
    #[error("invalid ZAP API URL: {0}")]
    InvalidUrl(String),
}

impl ZapError {
    /// Whether ZAP refused to create something that is already there.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::Api { code, .. } if code == "already_exists")
    }
}

impl From<ZapError> for EngineError {
    fn from(err: ZapError) -> Self {
        match err {
            ZapError::Http(e) => Self::Transport(e.to_string()),
            other => Self::Rejected(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_exists() {
        let err = ZapError::Api {
            status: 400,
            code: "already_exists".to_string(),
            message: "Already exists".to_string(),
        };
        assert!(err.is_already_exists());
        assert!(!ZapError::UnexpectedResponse("{}".to_string()).is_already_exists());
    }

    #[test]
    fn test_api_error_maps_to_rejection() {
        let err: EngineError = ZapError::Api {
            status: 400,
            code: "bad_view".to_string(),
            message: "No such view".to_string(),
        }
        .into();
        assert!(matches!(err, EngineError::Rejected(msg) if msg.contains("bad_view")));
    }
}
