//! Error types for the commit-status client.
//!
//! # Design
//! Callers react differently to "your credentials were rejected", "that
//! commit or pull request does not exist" and "the service could not be
//! reached", so each gets its own variant. `ApiError::kind` collapses the
//! variants into the five classes callers branch on; `HttpError` and the
//! (de)serialization failures count as transport-class failures.

use thiserror::Error;

use crate::http::TransportError;

/// Errors returned by `GitHubClient` operations and `GitHubProtocol` parse methods.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Caller-supplied input has the wrong shape. Never sent over the wire.
    #[error("malformed input: {0}")]
    Malformed(String),

    /// The service rejected the credentials (401/403).
    #[error("authentication failed (HTTP {status}): {message}")]
    AuthenticationFailed { status: u16, message: String },

    /// The pull request, commit or merge preview does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// No response was obtained.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The service returned a status not covered by the variants above.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// Credentials rejected locally at factory time.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

/// Coarse classification of an `ApiError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Malformed,
    AuthenticationFailure,
    NotFound,
    Transport,
    Configuration,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Malformed(_) => ErrorKind::Malformed,
            ApiError::AuthenticationFailed { .. } => ErrorKind::AuthenticationFailure,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::Transport(_)
            | ApiError::HttpError { .. }
            | ApiError::DeserializationError(_)
            | ApiError::SerializationError(_) => ErrorKind::Transport,
            ApiError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// True for failures of the remote exchange itself: not-found and
    /// transport-class errors. Authentication, input and configuration
    /// failures are not IO failures.
    pub fn is_io(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound | ErrorKind::Transport)
    }

    pub fn is_authentication_failure(&self) -> bool {
        self.kind() == ErrorKind::AuthenticationFailure
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
