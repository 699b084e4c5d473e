//! Error types shared by the session store, the directory client and the
//! dashboard workflows.

use thiserror::Error;

/// Result type alias for CloudDocs operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by CloudDocs operations.
///
/// Every variant is recoverable: callers turn it into a toast and leave the
/// directory view as it was.
#[derive(Debug, Error)]
pub enum Error {
    /// Network unreachable, DNS failure, timeout, TLS failure.
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Backend answered with a non-2xx status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// `detail` from the error body, or the body text itself.
        message: String,
    },

    /// Backend answered 2xx but the payload had an unexpected shape.
    #[error("Unexpected response: {0}")]
    Malformed(String),

    /// No bearer token held.
    #[error("Not logged in - run `clouddocs login` first")]
    NotAuthenticated,

    /// The token could not be decoded into identity claims.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Refused locally before any request was issued.
    #[error("{0}")]
    Rejected(String),

    /// The same workflow is already running.
    #[error("{0} already in progress")]
    Busy(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Creates an API error from a status code and message.
    #[must_use]
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Creates a local rejection.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }

    /// True for failures where the request never got an answer.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// True when the user has to log in (again).
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::NotAuthenticated | Self::InvalidToken(_) | Self::Api { status: 401, .. }
        )
    }
}
