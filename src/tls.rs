//! Connection policy and HTTP client construction.
//!
//! Both the `/trusted` POST and the export GET go through a client built
//! here, so certificate handling is decided in exactly one place.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Certificate, Client, ClientBuilder};
use thiserror::Error;
use tracing::{debug, warn};

use crate::user_agent;

/// Default connect timeout applied on top of the per-call timeout.
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// How a connection to the server is secured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsPolicy {
    /// Plain HTTP; certificate settings are ignored.
    Plaintext,
    /// HTTPS validated against the platform's default trust store.
    VerifyDefault,
    /// HTTPS validated against a PEM bundle on disk.
    VerifyWithBundle(PathBuf),
    /// HTTPS without certificate validation.
    NoVerify,
}

impl TlsPolicy {
    /// Builds the policy from the three configuration flags.
    ///
    /// An unset bundle with verification enabled falls back to the default
    /// trust store; it never disables verification.
    #[must_use]
    pub fn from_flags(use_tls: bool, verify_cert: bool, cert_bundle: Option<&Path>) -> Self {
        match (use_tls, verify_cert, cert_bundle) {
            (false, _, _) => Self::Plaintext,
            (true, false, _) => Self::NoVerify,
            (true, true, Some(bundle)) => Self::VerifyWithBundle(bundle.to_path_buf()),
            (true, true, None) => Self::VerifyDefault,
        }
    }

    /// URL scheme for this policy.
    #[must_use]
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Plaintext => "http",
            Self::VerifyDefault | Self::VerifyWithBundle(_) | Self::NoVerify => "https",
        }
    }
}

/// Errors raised while building a client for a [`TlsPolicy`].
#[derive(Debug, Error)]
pub enum ClientBuildError {
    /// The certificate bundle could not be read.
    #[error("cannot read certificate bundle {path}: {source}")]
    BundleRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The certificate bundle is not valid PEM.
    #[error("invalid certificate bundle {path}: {source}")]
    BundleParse {
        path: PathBuf,
        #[source]
        source: reqwest::Error,
    },

    /// The underlying client builder rejected the configuration.
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

impl ClientBuildError {
    /// Returns true when the failure comes from certificate configuration.
    #[must_use]
    pub fn is_certificate_error(&self) -> bool {
        matches!(self, Self::BundleRead { .. } | Self::BundleParse { .. })
    }
}

/// Builds an HTTP client honouring `policy` with an overall request timeout.
///
/// # Errors
///
/// Returns [`ClientBuildError`] when the bundle cannot be loaded or the
/// builder fails.
pub fn build_client(policy: &TlsPolicy, timeout: Duration) -> Result<Client, ClientBuildError> {
    let builder = base_client_builder(timeout);
    let builder = match policy {
        TlsPolicy::Plaintext => {
            debug!("NOT using TLS and NOT verifying certificate");
            builder
        }
        TlsPolicy::VerifyDefault => {
            debug!("using TLS and verifying certificate against default trust store");
            builder
        }
        TlsPolicy::VerifyWithBundle(path) => {
            debug!(certfile = %path.display(), "using TLS and verifying certificate");
            let mut builder = builder;
            for cert in load_bundle(path)? {
                builder = builder.add_root_certificate(cert);
            }
            builder
        }
        TlsPolicy::NoVerify => {
            warn!("using TLS and NOT verifying certificate; server identity is not checked");
            builder.danger_accept_invalid_certs(true)
        }
    };
    builder.build().map_err(ClientBuildError::Build)
}

fn base_client_builder(timeout: Duration) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS).min(timeout))
        .timeout(timeout)
        .gzip(true)
        .user_agent(user_agent::default_user_agent())
}

fn load_bundle(path: &Path) -> Result<Vec<Certificate>, ClientBuildError> {
    let pem = std::fs::read(path).map_err(|source| ClientBuildError::BundleRead {
        path: path.to_path_buf(),
        source,
    })?;
    Certificate::from_pem_bundle(&pem).map_err(|source| ClientBuildError::BundleParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Checks whether a reqwest error failed during TLS setup.
///
/// The default rustls backend reaches us through `tokio-rustls`, which wraps
/// handshake and certificate failures in an `io::Error` of kind
/// `InvalidData` and reports a peer hanging up mid-handshake as
/// "tls handshake eof". `InvalidData` only counts on connect errors, since
/// body decoding raises it too. The native-tls backend carries OpenSSL or
/// SChannel text instead, so messages below the top-level error are matched
/// against TLS vocabulary. The top-level message may embed the request URL
/// and is skipped.
pub(crate) fn is_tls_error(error: &reqwest::Error) -> bool {
    let connecting = error.is_connect();
    let mut current = std::error::Error::source(error);
    while let Some(err) = current {
        let invalid_data = err
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::InvalidData);
        if (connecting && invalid_data) || mentions_tls(&err.to_string()) {
            return true;
        }
        current = err.source();
    }
    false
}

fn mentions_tls(message: &str) -> bool {
    let message = message.to_lowercase();
    ["certificate", "tls", "ssl", "handshake"]
        .iter()
        .any(|needle| message.contains(needle))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_plaintext_ignores_cert_flags() {
        let policy = TlsPolicy::from_flags(false, true, Some(Path::new("/tmp/ca.pem")));
        assert_eq!(policy, TlsPolicy::Plaintext);
        assert_eq!(policy.scheme(), "http");
    }

    #[test]
    fn test_policy_verify_without_bundle_uses_default_store() {
        let policy = TlsPolicy::from_flags(true, true, None);
        assert_eq!(policy, TlsPolicy::VerifyDefault);
        assert_eq!(policy.scheme(), "https");
    }

    #[test]
    fn test_policy_verify_with_bundle() {
        let policy = TlsPolicy::from_flags(true, true, Some(Path::new("/etc/ca.pem")));
        assert_eq!(
            policy,
            TlsPolicy::VerifyWithBundle(PathBuf::from("/etc/ca.pem"))
        );
    }

    #[test]
    fn test_policy_no_verify_ignores_bundle() {
        let policy = TlsPolicy::from_flags(true, false, Some(Path::new("/etc/ca.pem")));
        assert_eq!(policy, TlsPolicy::NoVerify);
        assert_eq!(policy.scheme(), "https");
    }

    #[test]
    fn test_build_client_plaintext_succeeds() {
        assert!(build_client(&TlsPolicy::Plaintext, Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_build_client_no_verify_succeeds() {
        assert!(build_client(&TlsPolicy::NoVerify, Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_build_client_default_store_succeeds() {
        assert!(build_client(&TlsPolicy::VerifyDefault, Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_mentions_tls_vocabulary() {
        assert!(mentions_tls("tls handshake eof"));
        assert!(mentions_tls("error:0A00010B:SSL routines::wrong version number"));
        assert!(mentions_tls("invalid peer certificate: UnknownIssuer"));
        assert!(!mentions_tls("connection closed before message completed"));
        assert!(!mentions_tls("tcp connect error: Connection refused"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_not_tls() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = build_client(&TlsPolicy::Plaintext, Duration::from_secs(5)).unwrap();
        let err = client
            .get(format!("http://127.0.0.1:{port}/"))
            .send()
            .await
            .unwrap_err();
        assert!(!is_tls_error(&err));
    }

    #[test]
    fn test_build_client_missing_bundle_is_certificate_error() {
        let policy = TlsPolicy::VerifyWithBundle(PathBuf::from("/nonexistent/bundle.pem"));
        let err = build_client(&policy, Duration::from_secs(5)).unwrap_err();
        assert!(err.is_certificate_error());
        assert!(err.to_string().contains("/nonexistent/bundle.pem"));
    }
}
