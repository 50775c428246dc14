//! `POST /trusted` client.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, error, instrument};
use url::form_urlencoded;

use super::{Ticket, TicketError};
use crate::retry::{RetryPolicy, run_with_attempts};
use crate::tls::{ClientBuildError, TlsPolicy, build_client};

/// Identity presented to `/trusted`.
#[derive(Debug, Clone, Copy)]
pub struct TicketRequest<'a> {
    /// Server host (optionally with port).
    pub server: &'a str,
    /// Target site; empty for the default site.
    pub site: &'a str,
    /// Username the ticket is issued for.
    pub username: &'a str,
    /// Windows-style domain; `None` for local authentication.
    pub domain: Option<&'a str>,
    /// Client IP the ticket is bound to, when the server restricts by IP.
    pub client_ip: Option<&'a str>,
}

/// Issues trusted tickets over a client bound to one [`TlsPolicy`].
#[derive(Debug, Clone)]
pub struct TicketIssuer {
    client: Client,
    scheme: &'static str,
}

impl TicketIssuer {
    /// Creates an issuer with its own client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] when the client cannot be built for `policy`.
    pub fn new(policy: &TlsPolicy, timeout: Duration) -> Result<Self, ClientBuildError> {
        Ok(Self::with_client(build_client(policy, timeout)?, policy))
    }

    /// Creates an issuer sharing an existing client built for `policy`.
    #[must_use]
    pub fn with_client(client: Client, policy: &TlsPolicy) -> Self {
        Self {
            client,
            scheme: policy.scheme(),
        }
    }

    /// Obtains a ticket, making up to `max_attempts` attempts without delay.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::IssuanceFailed`] wrapping the last failure once
    /// every attempt has failed.
    #[instrument(
        skip(self, request),
        fields(server = %request.server, site = %request.site, username = %request.username)
    )]
    pub async fn issue(
        &self,
        request: &TicketRequest<'_>,
        max_attempts: u32,
    ) -> Result<Ticket, TicketError> {
        let url = trusted_url(self.scheme, request.server);
        let body = form_body(request);
        let details = format!(
            "Server: {}, Site: {}, Username: {}, Url: {}, Postdata: {}.",
            request.server, request.site, request.username, url, body
        );
        debug!(%details, "generating trusted ticket");

        let policy = RetryPolicy::with_max_attempts(max_attempts);
        let issuer = self;
        let (url_ref, body_ref, details_ref) = (url.as_str(), body.as_str(), details.as_str());

        run_with_attempts(&policy, |_: &TicketError| true, move |attempt| async move {
            let result = issuer.request_once(url_ref, body_ref).await;
            if let Err(e) = &result {
                error!(attempt, error = %e, details = %details_ref, "error generating trusted ticket");
            }
            result
        })
        .await
        .map_err(|exhausted| TicketError::IssuanceFailed {
            details: details.clone(),
            attempts: exhausted.attempts,
            last: Box::new(exhausted.last),
        })
    }

    async fn request_once(&self, url: &str, body: &str) -> Result<Ticket, TicketError> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body.to_owned())
            .send()
            .await
            .map_err(|e| TicketError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TicketError::http_status(url, status.as_u16()));
        }

        let raw = response
            .text()
            .await
            .map_err(|e| TicketError::from_reqwest(url, e))?;
        let ticket = Ticket::parse(&raw)?;
        debug!("got trusted ticket");
        Ok(ticket)
    }
}

/// Builds `{scheme}://{server}/trusted`.
#[must_use]
pub fn trusted_url(scheme: &str, server: &str) -> String {
    format!("{scheme}://{server}/trusted")
}

/// Encodes the `/trusted` form body: `username`, then `client_ip` and
/// `target_site` when present.
#[must_use]
pub fn form_body(request: &TicketRequest<'_>) -> String {
    let username = match request.domain {
        Some(domain) => format!("{domain}\\{}", request.username),
        None => request.username.to_string(),
    };

    let mut form = form_urlencoded::Serializer::new(String::new());
    form.append_pair("username", &username);
    if let Some(client_ip) = request.client_ip {
        form.append_pair("client_ip", client_ip);
    }
    if !request.site.is_empty() {
        form.append_pair("target_site", request.site);
    }
    form.finish()
}
