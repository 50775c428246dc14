//! Error types for view export.
//!
//! Every per-attempt variant is retryable; [`ExportError::AttemptsExhausted`]
//! is the single error an export call surfaces.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::ticket::TicketError;
use crate::tls::{ClientBuildError, is_tls_error};

/// Errors that can occur while exporting a view.
#[derive(Debug, Error)]
pub enum ExportError {
    /// No ticket could be obtained for this attempt.
    #[error("trusted ticket unavailable for {url}: {source}")]
    Ticket {
        /// Display URL of the view.
        url: String,
        /// The issuance failure.
        #[source]
        source: TicketError,
    },

    /// The export GET returned a 4xx/5xx status.
    #[error("HTTP error getting view from {url}. Code: {status} Reason: {reason}")]
    HttpStatus {
        /// Display URL of the view.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// Canonical reason phrase for the status.
        reason: String,
    },

    /// The attempt did not finish within the per-call timeout.
    #[error("timeout: could not retrieve view from {url} within {} seconds", .timeout.as_secs_f64())]
    Timeout {
        /// Display URL of the view.
        url: String,
        /// The per-attempt timeout.
        timeout: Duration,
    },

    /// TLS handshake or certificate validation failed.
    #[error("TLS error getting view from {url}: {message}")]
    Tls {
        /// Display URL of the view.
        url: String,
        /// Description of the TLS failure.
        message: String,
    },

    /// Other network-level failure.
    #[error("transport error getting view from {url}: {source}")]
    Transport {
        /// Display URL of the view.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Creating or writing the output file failed.
    #[error("unable to write {path} for {url}: {source}")]
    Io {
        /// Display URL of the view.
        url: String,
        /// The output file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Any other failure.
    #[error("unexpected error exporting {url}: {message}")]
    Unclassified {
        /// Display URL of the view.
        url: String,
        /// Description of the failure.
        message: String,
    },

    /// Every attempt failed; carries the last cause.
    #[error("export of {url} failed after {attempts} attempt(s): {last}")]
    AttemptsExhausted {
        /// Display URL of the view.
        url: String,
        /// Number of attempts made.
        attempts: u32,
        /// Error of the final attempt.
        #[source]
        last: Box<ExportError>,
    },
}

impl ExportError {
    /// Creates an HTTP status error with the canonical reason phrase.
    pub fn http_status(url: impl Into<String>, status: reqwest::StatusCode) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    }

    /// Creates an IO error.
    pub fn io(url: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            url: url.into(),
            path: path.into(),
            source,
        }
    }

    /// Classifies a reqwest error raised while sending or streaming.
    ///
    /// The request URL is stripped from `source`, since it holds the ticket.
    pub fn from_reqwest(url: impl Into<String>, timeout: Duration, source: reqwest::Error) -> Self {
        let url = url.into();
        let source = source.without_url();
        if source.is_timeout() {
            Self::Timeout { url, timeout }
        } else if is_tls_error(&source) {
            Self::Tls {
                url,
                message: source.to_string(),
            }
        } else if source.is_builder() {
            Self::Unclassified {
                url,
                message: source.to_string(),
            }
        } else {
            Self::Transport { url, source }
        }
    }

    /// Maps a client construction failure.
    pub fn client(url: impl Into<String>, source: &ClientBuildError) -> Self {
        if source.is_certificate_error() {
            Self::Tls {
                url: url.into(),
                message: source.to_string(),
            }
        } else {
            Self::Unclassified {
                url: url.into(),
                message: source.to_string(),
            }
        }
    }

    /// Whether another attempt may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::AttemptsExhausted { .. })
    }

    /// HTTP status of the export GET, looking through an exhausted error.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::AttemptsExhausted { last, .. } => last.status(),
            _ => None,
        }
    }
}
