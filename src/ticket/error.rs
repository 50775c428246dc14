//! Error types for trusted-ticket issuance.

use thiserror::Error;

use crate::tls::{ClientBuildError, is_tls_error};

/// Errors that can occur while obtaining a trusted ticket.
#[derive(Debug, Error)]
pub enum TicketError {
    /// The server answered with the failure sentinel (`-1`) or an empty body.
    #[error("invalid trusted ticket {value:?} returned by server")]
    Invalid {
        /// The rejected body, after trimming.
        value: String,
    },

    /// `/trusted` answered with a non-success status.
    #[error("HTTP {status} requesting trusted ticket from {url}")]
    HttpStatus {
        /// The ticket endpoint.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The request did not complete within the configured timeout.
    #[error("timeout requesting trusted ticket from {url}")]
    Timeout {
        /// The ticket endpoint.
        url: String,
    },

    /// TLS handshake or certificate validation failed.
    #[error("TLS error requesting trusted ticket from {url}: {message}")]
    Tls {
        /// The ticket endpoint.
        url: String,
        /// Description of the TLS failure.
        message: String,
    },

    /// Other network-level failure (DNS, connection refused, reset).
    #[error("network error requesting trusted ticket from {url}: {source}")]
    Network {
        /// The ticket endpoint.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("cannot prepare client for {url}: {source}")]
    Client {
        /// The ticket endpoint.
        url: String,
        /// The client construction failure.
        #[source]
        source: ClientBuildError,
    },

    /// Every issuance attempt failed.
    #[error(
        "failed to obtain trusted ticket after {attempts} attempt(s): {last}. Request details: {details}"
    )]
    IssuanceFailed {
        /// Server, site, username, URL and encoded body of the request.
        details: String,
        /// Number of attempts made.
        attempts: u32,
        /// Error returned by the last attempt.
        #[source]
        last: Box<TicketError>,
    },
}

impl TicketError {
    /// Creates an invalid-ticket error.
    pub fn invalid(value: impl Into<String>) -> Self {
        Self::Invalid {
            value: value.into(),
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a client construction error; certificate problems become TLS errors.
    pub fn client(url: impl Into<String>, source: ClientBuildError) -> Self {
        if source.is_certificate_error() {
            Self::Tls {
                url: url.into(),
                message: source.to_string(),
            }
        } else {
            Self::Client {
                url: url.into(),
                source,
            }
        }
    }

    /// Classifies a reqwest error into timeout, TLS or network failure.
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else if is_tls_error(&source) {
            Self::Tls {
                url,
                message: source.to_string(),
            }
        } else {
            Self::Network { url, source }
        }
    }

    /// Returns true when this error means issuance gave up.
    #[must_use]
    pub fn is_issuance_failure(&self) -> bool {
        matches!(self, Self::IssuanceFailed { .. })
    }
}
