//! Error handling for crxdl.
//!
//! This module provides centralized error handling for every stage of a job:
//! identifier validation, network retrieval, container conversion and archive
//! validation. Errors are `Clone` so that a single terminal outcome can be
//! handed to every job sharing a fetch key and stored in the cache.

use std::fmt;
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can happen when using crxdl.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The extension identifier is not 32 characters drawn from `a`-`p`.
    ///
    /// Rejected before any network activity takes place.
    #[error("Invalid extension identifier: {0:?} (expected 32 characters in a-p)")]
    InvalidIdentifierFormat(String),

    /// Error from the underlying URL parser.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The vendor reported that no content is available for this item.
    ///
    /// This is permanent for the lifetime of the process and is never retried.
    #[error("Extension is not available for download")]
    NotAvailable,

    /// A network failure that survived every retry attempt, or a
    /// non-retryable HTTP status.
    #[error("Transport error: {0}")]
    Transport(TransportError),

    /// The buffer is neither a plain archive nor a supported container.
    #[error("Unrecognized package format: {0}")]
    Format(String),

    /// The buffer ends before the container header does.
    #[error("Truncated container: header needs {needed} bytes, got {actual}")]
    TruncatedFile { needed: u64, actual: u64 },

    /// Containers were nested deeper than allowed.
    #[error("Nested container at depth {depth} exceeds the nesting limit")]
    NestedFormatLoop { depth: usize },

    /// The response body grew beyond the configured maximum.
    #[error("Response exceeds the size limit of {limit} bytes (received {received})")]
    SizeLimitExceeded { limit: u64, received: u64 },

    /// The extracted payload is not a well-formed archive.
    #[error("Archive integrity check failed: {0}")]
    Integrity(String),

    /// The batch was cancelled before this job finished.
    #[error("Job cancelled")]
    Cancelled,

    /// Invalid downloader configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// I/O Error.
    ///
    /// Raised while writing a converted archive to the output directory.
    #[error("I/O error: {0}")]
    IOError(Arc<io::Error>),

    /// Error from the Reqwest library while building the HTTP client.
    #[error("Reqwest error: {0}")]
    Reqwest(Arc<reqwest::Error>),

    /// Error from an underlying system.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this failure describes the response itself rather than a
    /// transient condition, and may therefore be cached.
    pub fn is_permanent(&self) -> bool {
        !matches!(
            self,
            Error::Transport(_) | Error::Cancelled | Error::Internal(_) | Error::IOError(_)
        )
    }
}

impl From<io::Error> for Error {
    fn from(source: io::Error) -> Self {
        Error::IOError(Arc::new(source))
    }
}

impl From<reqwest::Error> for Error {
    fn from(source: reqwest::Error) -> Self {
        Error::Reqwest(Arc::new(source))
    }
}

impl From<TransportError> for Error {
    fn from(source: TransportError) -> Self {
        match source.kind {
            TransportErrorKind::NotAvailable => Error::NotAvailable,
            _ => Error::Transport(source),
        }
    }
}

/// Category of a failed network retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The request or a body read timed out.
    Timeout,
    /// The connection could not be established or was reset.
    Connection,
    /// Reading the response body failed mid-stream.
    Body,
    /// The server answered with an error status.
    Status,
    /// The server answered "no content" (or an HTML page instead of a package).
    NotAvailable,
    /// Anything else; never retried.
    Other,
}

/// Failure reported by a [`Fetcher`](crate::http::Fetcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    /// What went wrong.
    pub kind: TransportErrorKind,
    /// HTTP status code, when the server answered.
    pub status_code: Option<u16>,
    /// Whether re-issuing the request may succeed.
    pub transient: bool,
    /// Human readable details.
    pub message: String,
}

impl TransportError {
    fn new(kind: TransportErrorKind, transient: bool, message: impl Into<String>) -> Self {
        Self {
            kind,
            status_code: None,
            transient,
            message: message.into(),
        }
    }

    /// A timed out request.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, true, message)
    }

    /// A refused or reset connection.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connection, true, message)
    }

    /// A failure while streaming the body.
    pub fn body(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Body, true, message)
    }

    /// A non-retryable failure.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Other, false, message)
    }

    /// The item cannot be distributed in this form.
    pub fn not_available(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::NotAvailable, false, message)
    }

    /// An unsuccessful HTTP status.
    ///
    /// `204 No Content` maps to [`TransportErrorKind::NotAvailable`]. Server
    /// errors, `408` and `429` are transient; other statuses are not.
    pub fn status(code: u16) -> Self {
        if code == 204 {
            let mut err = Self::not_available("HTTP 204: no content");
            err.status_code = Some(code);
            return err;
        }
        let transient = code >= 500 || code == 408 || code == 429;
        Self {
            kind: TransportErrorKind::Status,
            status_code: Some(code),
            transient,
            message: format!("HTTP {}", code),
        }
    }

    /// Whether the orchestrator should schedule another attempt.
    pub fn is_transient(&self) -> bool {
        self.transient
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "{:?} ({}): {}", self.kind, code, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for TransportError {}

/// Result type alias for operations that can fail with a crxdl error.
pub type Result<T> = std::result::Result<T, Error>;
