//! Centralized error types for mailsift.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailsift library.
#[derive(Error, Debug)]
pub enum MailsiftError {
    /// No usable access token could be found.
    #[error("No mail API credentials found. {hint}")]
    MissingCredential { hint: String },

    /// The HTTP request to the mail API could not be completed.
    #[error("{context}: {source}")]
    Remote {
        context: String,
        source: reqwest::Error,
    },

    /// The mail API answered with a non-success status.
    #[error("Mail API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// A message or attachment id is not known to the store.
    #[error("Not found: {0}")]
    NotFound(String),

    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A base64 payload could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The sender pattern is not a valid regular expression.
    #[error("Invalid sender pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    /// The OAuth refresh-token exchange failed.
    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),

    /// The stored token file could not be parsed or written.
    #[error("Token file '{path}' is invalid: {reason}")]
    InvalidToken { path: PathBuf, reason: String },
}

/// Convenience alias for `Result<T, MailsiftError>`.
pub type Result<T> = std::result::Result<T, MailsiftError>;

impl MailsiftError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a transport error with a short description of the call.
    pub fn remote(context: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Remote {
            context: context.into(),
            source,
        }
    }
}
