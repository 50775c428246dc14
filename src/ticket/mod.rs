//! Trusted-ticket issuance.
//!
//! A trusted ticket is a single-use token handed out by `POST /trusted` for a
//! username (and optionally a site and client IP). It authorizes exactly one
//! subsequent view request, so [`Ticket`] is a move-only value: composing the
//! export URL consumes it.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use viz_export::tls::TlsPolicy;
//! use viz_export::ticket::{TicketIssuer, TicketRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let issuer = TicketIssuer::new(&TlsPolicy::VerifyDefault, Duration::from_secs(30))?;
//! let request = TicketRequest {
//!     server: "viz.example.com",
//!     site: "finance",
//!     username: "alice",
//!     domain: None,
//!     client_ip: None,
//! };
//! let ticket = issuer.issue(&request, 3).await?;
//! # drop(ticket);
//! # Ok(())
//! # }
//! ```

mod error;
mod issuer;

use std::fmt;

pub use error::TicketError;
pub use issuer::{TicketIssuer, TicketRequest, form_body, trusted_url};

/// Value returned by `/trusted` when the server refuses to issue a ticket.
pub const FAILURE_SENTINEL: &str = "-1";

/// A single-use trusted ticket.
pub struct Ticket(String);

impl Ticket {
    /// Validates a raw `/trusted` response body.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Invalid`] for the `-1` sentinel or an empty body.
    pub fn parse(raw: &str) -> Result<Self, TicketError> {
        let value = raw.trim();
        if value.is_empty() || value == FAILURE_SENTINEL {
            return Err(TicketError::invalid(value));
        }
        Ok(Self(value.to_string()))
    }

    /// Consumes the ticket, yielding the token for the export URL.
    #[must_use]
    pub fn into_secret(self) -> String {
        self.0
    }
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Ticket(<redacted>)")
    }
}
