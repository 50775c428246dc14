//! Trusted-ticket view exporter.
//!
//! This library exports views (PNG, PDF, CSV or TWB) from a visualization
//! server that supports trusted authentication: a ticket is requested from
//! `/trusted` for a subscriber, then exchanged for the rendered view, which
//! is written to a local file.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`ticket`] - Trusted-ticket issuance (`POST /trusted`)
//! - [`export`] - URL composition, authenticated GET and file output
//! - [`retry`] - Bounded-attempt retry shared by both stages
//! - [`tls`] - Connection policy and HTTP client construction
//! - [`config`] - `config.toml` loading for server settings

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod export;
pub mod retry;
pub mod ticket;
pub mod tls;
mod user_agent;

// Re-export commonly used types
pub use config::{ConfigError, FileConfig};
pub use export::{
    ExportError, ExportFormat, ExportRequest, ServerSettings, ViewDescriptor, ViewExporter,
};
pub use retry::{DEFAULT_MAX_ATTEMPTS, RetryDecision, RetryPolicy};
pub use ticket::{Ticket, TicketError, TicketIssuer, TicketRequest};
pub use tls::TlsPolicy;
