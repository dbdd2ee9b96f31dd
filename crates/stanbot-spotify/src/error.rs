//! Error types for Spotify Web API access.

use thiserror::Error;

/// Result type for Spotify operations.
pub type SpotifyResult<T> = Result<T, SpotifyError>;

/// Errors that can occur talking to the Spotify Web API.
#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("track not found: {0}")]
    TrackNotFound(String),

    #[error("request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl SpotifyError {
    /// Create an authentication failure error.
    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self::AuthFailed(message.into())
    }

    /// Create a request failure error.
    pub fn request_failed(status: u16, body: impl Into<String>) -> Self {
        Self::RequestFailed {
            status,
            body: body.into(),
        }
    }

    /// Create an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// Whether retrying the request might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::RequestFailed { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
