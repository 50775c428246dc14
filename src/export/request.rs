//! Export request types.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::retry::DEFAULT_MAX_ATTEMPTS;
use crate::ticket::TicketRequest;
use crate::tls::TlsPolicy;

/// Default PNG width in pixels.
pub const DEFAULT_PNG_WIDTH: u32 = 1600;

/// Default PNG height in pixels.
pub const DEFAULT_PNG_HEIGHT: u32 = 1200;

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Site name the server uses for its unnamed default site.
const DEFAULT_SITE_NAME: &str = "Default";

/// Domain value meaning the server uses local authentication.
const LOCAL_DOMAIN: &str = "local";

/// Output format of an exported view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// Underlying data as comma-separated text.
    Csv,
    /// Rendered image.
    Png,
    /// Rendered document.
    Pdf,
    /// Workbook definition.
    Twb,
}

impl ExportFormat {
    /// Lowercase name used in the `:format` parameter and as file extension.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Png => "png",
            Self::Pdf => "pdf",
            Self::Twb => "twb",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unsupported format name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported export format '{0}' (expected csv, png, pdf or twb)")]
pub struct UnknownFormat(pub String);

impl FromStr for ExportFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "png" => Ok(Self::Png),
            "pdf" => Ok(Self::Pdf),
            "twb" => Ok(Self::Twb),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// Server connection settings supplied by configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Server host, optionally with port.
    pub host: String,
    /// Use HTTPS.
    pub use_tls: bool,
    /// Validate the server certificate when using HTTPS.
    pub verify_cert: bool,
    /// PEM bundle to validate against; `None` uses the default trust store.
    pub cert_bundle: Option<PathBuf>,
    /// Client IP forwarded to `/trusted`.
    pub client_ip: Option<String>,
}

impl ServerSettings {
    /// HTTPS with certificate validation against the default trust store.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            use_tls: true,
            verify_cert: true,
            cert_bundle: None,
            client_ip: None,
        }
    }

    /// Connection policy derived from the TLS flags.
    #[must_use]
    pub fn tls_policy(&self) -> TlsPolicy {
        TlsPolicy::from_flags(self.use_tls, self.verify_cert, self.cert_bundle.as_deref())
    }
}

/// One view to export and the subscriber it is exported for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewDescriptor {
    /// Site identifier; empty for the default site.
    pub site: String,
    /// Subscriber username.
    pub username: String,
    /// Subscriber domain; `None` for local authentication.
    pub domain: Option<String>,
    /// `workbook/view`, optionally followed by `?param=value&...`.
    pub view_url_suffix: String,
    /// PNG width when the suffix does not override `:size`.
    pub png_width: u32,
    /// PNG height when the suffix does not override `:size`.
    pub png_height: u32,
    /// Ask the server to bypass its cache.
    pub force_refresh: bool,
    /// Timeout for each network attempt.
    pub timeout: Duration,
    /// Total export attempts.
    pub max_attempts: u32,
}

impl ViewDescriptor {
    /// Descriptor for the default site with local auth and default settings.
    #[must_use]
    pub fn new(username: impl Into<String>, view_url_suffix: impl Into<String>) -> Self {
        Self {
            site: String::new(),
            username: username.into(),
            domain: None,
            view_url_suffix: view_url_suffix.into(),
            png_width: DEFAULT_PNG_WIDTH,
            png_height: DEFAULT_PNG_HEIGHT,
            force_refresh: false,
            timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Maps the server's display name of the default site to the empty identifier.
#[must_use]
pub fn normalize_site_name(name: &str) -> String {
    let name = name.trim();
    if name == DEFAULT_SITE_NAME {
        String::new()
    } else {
        name.to_string()
    }
}

/// Maps `local` (or an empty value) to "no domain".
#[must_use]
pub fn normalize_domain(domain: &str) -> Option<String> {
    let domain = domain.trim();
    if domain.is_empty() || domain == LOCAL_DOMAIN {
        None
    } else {
        Some(domain.to_string())
    }
}

/// Everything needed for one export call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    /// Server connection settings.
    pub server: ServerSettings,
    /// View and subscriber.
    pub view: ViewDescriptor,
    /// Output format.
    pub format: ExportFormat,
    /// Directory the exported file is written to.
    pub dest_dir: PathBuf,
}

impl ExportRequest {
    /// Identity presented to `/trusted` for this export.
    #[must_use]
    pub fn ticket_request(&self) -> TicketRequest<'_> {
        TicketRequest {
            server: &self.server.host,
            site: &self.view.site,
            username: &self.view.username,
            domain: self.view.domain.as_deref(),
            client_ip: self.server.client_ip.as_deref(),
        }
    }

    /// Username sent as the export credential: `domain\username` or `username`.
    #[must_use]
    pub fn credential_username(&self) -> String {
        match &self.view.domain {
            Some(domain) => format!("{domain}\\{}", self.view.username),
            None => self.view.username.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request() -> ExportRequest {
        ExportRequest {
            server: ServerSettings::new("viz.local"),
            view: ViewDescriptor::new("alice", "Sales/Overview"),
            format: ExportFormat::Png,
            dest_dir: PathBuf::from("/tmp"),
        }
    }

    #[test]
    fn test_format_parse_is_case_insensitive() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("twb".parse::<ExportFormat>().unwrap(), ExportFormat::Twb);
        assert_eq!(ExportFormat::Pdf.to_string(), "pdf");
    }

    #[test]
    fn test_format_parse_rejects_unknown() {
        let err = "xlsx".parse::<ExportFormat>().unwrap_err();
        assert!(err.to_string().contains("xlsx"));
    }

    #[test]
    fn test_normalize_site_name_default_is_empty() {
        assert_eq!(normalize_site_name("Default"), "");
        assert_eq!(normalize_site_name("Finance"), "Finance");
        assert_eq!(normalize_site_name("DefaultSite"), "DefaultSite");
    }

    #[test]
    fn test_normalize_domain_local_is_none() {
        assert_eq!(normalize_domain("local"), None);
        assert_eq!(normalize_domain(""), None);
        assert_eq!(normalize_domain("CORP"), Some("CORP".to_string()));
    }

    #[test]
    fn test_credential_username_without_domain() {
        assert_eq!(request().credential_username(), "alice");
    }

    #[test]
    fn test_credential_username_with_domain() {
        let mut req = request();
        req.view.domain = Some("CORP".to_string());
        assert_eq!(req.credential_username(), "CORP\\alice");
    }

    #[test]
    fn test_ticket_request_carries_identity() {
        let mut req = request();
        req.view.site = "finance".to_string();
        req.server.client_ip = Some("10.1.2.3".to_string());
        let ticket = req.ticket_request();
        assert_eq!(ticket.server, "viz.local");
        assert_eq!(ticket.site, "finance");
        assert_eq!(ticket.client_ip, Some("10.1.2.3"));
        assert_eq!(ticket.domain, None);
    }

    #[test]
    fn test_server_settings_tls_policy() {
        let mut server = ServerSettings::new("viz.local");
        assert_eq!(server.tls_policy(), TlsPolicy::VerifyDefault);
        server.use_tls = false;
        assert_eq!(server.tls_policy(), TlsPolicy::Plaintext);
    }
}
