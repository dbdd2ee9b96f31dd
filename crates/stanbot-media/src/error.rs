//! Error types for the GIF conversion pipeline.
//!
//! The taxonomy mirrors the pipeline stages: decoding a source into frames,
//! encoding frames into a GIF, and the compression loop that drives both.

use std::io;
use thiserror::Error;

/// Result type for frame decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Result type for GIF encoding.
pub type EncodeResult<T> = Result<T, EncodeError>;

/// Result type for the compression loop.
pub type CompressResult<T> = Result<T, CompressError>;

/// Errors that can occur while turning a source file into frames.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported media type")]
    UnsupportedType,

    #[error("{0} not found in PATH")]
    ToolNotFound(String),

    #[error("transcoder failed: {message}")]
    ToolFailure {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("corrupt source: {0}")]
    CorruptSource(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl DecodeError {
    /// Create a transcoder failure error.
    pub fn tool_failure(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::ToolFailure {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a corrupt source error.
    pub fn corrupt_source(message: impl Into<String>) -> Self {
        Self::CorruptSource(message.into())
    }
}

/// Errors that can occur while writing a frame sequence out as a GIF.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("no frames to encode")]
    EmptySequence,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<gif::EncodingError> for EncodeError {
    fn from(err: gif::EncodingError) -> Self {
        match err {
            gif::EncodingError::Io(e) => Self::Io(e),
            other => Self::Io(io::Error::new(io::ErrorKind::Other, other.to_string())),
        }
    }
}

/// A failure inside a single compression attempt, from either stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Errors that abort the compression loop.
#[derive(Debug, Error)]
pub enum CompressError {
    #[error("attempt {attempt} failed: {source}")]
    Stage {
        attempt: u32,
        #[source]
        source: StageError,
    },

    #[error("workspace error: {0}")]
    Workspace(#[from] io::Error),
}

impl CompressError {
    /// Wrap a stage failure with the attempt index it happened on.
    pub fn stage(attempt: u32, source: impl Into<StageError>) -> Self {
        Self::Stage {
            attempt,
            source: source.into(),
        }
    }

    /// Attempt index the failure happened on, if it came from a stage.
    pub fn attempt(&self) -> Option<u32> {
        match self {
            Self::Stage { attempt, .. } => Some(*attempt),
            Self::Workspace(_) => None,
        }
    }
}
