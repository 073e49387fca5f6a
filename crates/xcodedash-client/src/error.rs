//! Normalized error types for backend client operations.
//!
//! Transport-agnostic errors that hide reqwest/HTTP details and give callers
//! the categories the dashboard's retry and notification policies need.

use thiserror::Error;

/// Normalized error for backend API operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// No response obtained: connection refused, DNS failure, timeout.
    #[error("backend unreachable: {message}")]
    Transport { message: String },

    /// A response arrived but with a non-success HTTP status.
    #[error("backend returned {status}: {detail}")]
    Api { status: u16, detail: String },

    /// A response arrived but its body could not be decoded.
    #[error("malformed backend response: {message}")]
    Decode { message: String },

    /// The configured base URL is not a valid absolute URL.
    #[error("invalid base url: {message}")]
    InvalidBaseUrl { message: String },
}

impl ClientError {
    /// Whether this error means no response was obtained at all.
    ///
    /// Job polling treats transport failures as non-terminal when configured
    /// to do so; every other category terminates the wait.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}
