//! Error types for profile storage.

use thiserror::Error;

/// Result type for profile operations.
pub type ProfileResult<T> = Result<T, ProfileError>;

/// Errors that can occur reading or writing stored profile links.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("invalid profile link: {0}")]
    InvalidLink(String),

    #[error("request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ProfileError {
    /// Create a configuration error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Create an invalid link error.
    pub fn invalid_link(message: impl Into<String>) -> Self {
        Self::InvalidLink(message.into())
    }

    /// Create a request failure error.
    pub fn request_failed(status: u16, body: impl Into<String>) -> Self {
        Self::RequestFailed {
            status,
            body: body.into(),
        }
    }
}
