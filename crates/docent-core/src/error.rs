// Error types for run dispatch and the remote assistant API

use std::time::Duration;
use thiserror::Error;

/// Result type alias for Docent operations
pub type Result<T> = std::result::Result<T, DocentError>;

/// Errors that can occur while talking to the assistant service or dispatching a run
///
/// Capability failures are deliberately absent: they are converted to string
/// outputs (see `CapabilityResult`) so a callback batch can always be answered.
#[derive(Debug, Error)]
pub enum DocentError {
    /// Remote API answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure reaching the remote API
    #[error("HTTP error: {0}")]
    Http(String),

    /// Configuration error (missing key, bad value)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Capability registry failed startup validation
    #[error("Capability registry error: {0}")]
    Registry(String),

    /// Dispatcher produced an inconsistent callback batch
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// Run did not settle before the deadline
    #[error("Run did not settle within {0:?}")]
    Timeout(Duration),

    /// Dispatch was cancelled by the caller or by shutdown
    #[error("Run dispatch cancelled")]
    Cancelled,

    /// Local filesystem error (document upload)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl DocentError {
    /// Create an API error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        DocentError::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn http(msg: impl Into<String>) -> Self {
        DocentError::Http(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        DocentError::Configuration(msg.into())
    }

    /// Create a registry validation error
    pub fn registry(msg: impl Into<String>) -> Self {
        DocentError::Registry(msg.into())
    }

    /// Create a dispatch error
    pub fn dispatch(msg: impl Into<String>) -> Self {
        DocentError::Dispatch(msg.into())
    }

    /// True when the remote rejected the request as not found (bad thread/run id)
    pub fn is_not_found(&self) -> bool {
        matches!(self, DocentError::Api { status: 404, .. })
    }
}

impl From<reqwest::Error> for DocentError {
    fn from(err: reqwest::Error) -> Self {
        DocentError::Http(err.to_string())
    }
}
