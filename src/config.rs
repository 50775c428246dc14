//! `config.toml` loading for server settings.
//!
//! ```toml
//! [server]
//! host = "viz.example.com"
//! ssl = true
//! certcheck = true
//! certfile = "/etc/ssl/certs/internal-ca.pem"
//!
//! [temp]
//! dir = "/var/tmp/viz-export"
//!
//! [trusted]
//! use_client_ip = false
//! client_ip = "10.0.0.5"
//! ```

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::export::ServerSettings;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "VIZ_EXPORT_CONFIG";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub temp: TempSection,
    #[serde(default)]
    pub trusted: TrustedSection,
}

/// `[server]` table.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Server host, optionally with port.
    #[serde(default)]
    pub host: String,
    /// Use HTTPS.
    #[serde(default)]
    pub ssl: bool,
    /// Validate the server certificate.
    #[serde(default = "default_true")]
    pub certcheck: bool,
    /// PEM bundle to validate against.
    pub certfile: Option<PathBuf>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: String::new(),
            ssl: false,
            certcheck: true,
            certfile: None,
        }
    }
}

/// `[temp]` table.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TempSection {
    /// Directory exports are written to.
    pub dir: Option<PathBuf>,
}

/// `[trusted]` table.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TrustedSection {
    /// Forward `client_ip` to `/trusted`.
    #[serde(default)]
    pub use_client_ip: bool,
    /// Client IP tickets are bound to.
    pub client_ip: Option<String>,
}

fn default_true() -> bool {
    true
}

impl FileConfig {
    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] or [`ConfigError::Validation`].
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is missing, unreadable or invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded configuration file");
        Self::from_toml_str(&raw)
    }

    /// Loads the default config file when one exists.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an existing file cannot be read or parsed.
    pub fn load_default() -> Result<Option<Self>, ConfigError> {
        match resolve_default_config_path() {
            Some(path) if path.exists() => Self::load(&path).map(Some),
            _ => Ok(None),
        }
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trusted.use_client_ip
            && self
                .trusted
                .client_ip
                .as_deref()
                .is_none_or(|ip| ip.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "`trusted.client_ip` is required when `trusted.use_client_ip` is true".to_string(),
            ));
        }
        if !self.server.host.is_empty() && self.server.host.trim().is_empty() {
            return Err(ConfigError::Validation(
                "`server.host` must not be blank".to_string(),
            ));
        }
        if self.server.host.contains('/') {
            return Err(ConfigError::Validation(format!(
                "`server.host` must be a host name without scheme or path, got '{}'",
                self.server.host
            )));
        }
        if let Some(certfile) = &self.server.certfile
            && !self.server.ssl
        {
            warn!(
                certfile = %certfile.display(),
                "`server.certfile` is ignored because `server.ssl` is false"
            );
        }
        Ok(())
    }

    /// Server settings, or `None` when no host is configured.
    #[must_use]
    pub fn server_settings(&self) -> Option<ServerSettings> {
        let host = self.server.host.trim();
        if host.is_empty() {
            return None;
        }
        Some(ServerSettings {
            host: host.to_string(),
            use_tls: self.server.ssl,
            verify_cert: self.server.certcheck,
            cert_bundle: self.server.certfile.clone(),
            client_ip: self.client_ip(),
        })
    }

    /// Client IP to forward, honouring `use_client_ip`.
    #[must_use]
    pub fn client_ip(&self) -> Option<String> {
        if self.trusted.use_client_ip {
            self.trusted.client_ip.clone()
        } else {
            None
        }
    }
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$VIZ_EXPORT_CONFIG`
/// 2. `$XDG_CONFIG_HOME/viz-export/config.toml`
/// 3. `$HOME/.config/viz-export/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(explicit) = env_var_non_empty_os(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(explicit));
    }

    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("viz-export")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("viz-export")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}
