//! The export retry loop.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, instrument};

use super::error::ExportError;
use super::filename::{Clock, SystemClock, current_worker_id, export_filename, sanitize_worker_id};
use super::request::ExportRequest;
use super::view_url::ViewUrl;
use super::writer::write_response;
use crate::retry::{RetryPolicy, run_with_attempts};
use crate::ticket::TicketIssuer;
use crate::tls::build_client;

/// Ticket issuance attempts made inside each export attempt.
pub const DEFAULT_TICKET_ATTEMPTS: u32 = 1;

/// Exports views through trusted tickets.
///
/// Holds no per-request state, so one exporter can serve concurrent calls.
/// Each attempt builds its own client, requests a fresh ticket and writes to
/// its own file.
#[derive(Clone)]
pub struct ViewExporter {
    worker_id: Option<String>,
    ticket_attempts: u32,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ViewExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewExporter")
            .field("worker_id", &self.worker_id)
            .field("ticket_attempts", &self.ticket_attempts)
            .finish_non_exhaustive()
    }
}

impl Default for ViewExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewExporter {
    /// Exporter using the wall clock and a fresh worker id for every attempt.
    #[must_use]
    pub fn new() -> Self {
        Self {
            worker_id: None,
            ticket_attempts: DEFAULT_TICKET_ATTEMPTS,
            clock: Arc::new(SystemClock),
        }
    }

    /// Fixes the worker identifier embedded in filenames.
    ///
    /// Concurrent exports sharing a fixed id and a clock tick write to the
    /// same name; give each concurrent caller its own id.
    #[must_use]
    pub fn with_worker_id(mut self, worker_id: &str) -> Self {
        self.worker_id = Some(sanitize_worker_id(worker_id));
        self
    }

    /// Sets how many issuance attempts each export attempt may make (minimum 1).
    #[must_use]
    pub fn with_ticket_attempts(mut self, attempts: u32) -> Self {
        self.ticket_attempts = attempts.max(1);
        self
    }

    /// Replaces the clock used for filename timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Exports one view, returning the path of the written file.
    ///
    /// The path is `request.dest_dir` joined with a generated filename.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::AttemptsExhausted`] carrying the display URL,
    /// the number of attempts and the last failure.
    #[instrument(
        skip(self, request),
        fields(view = %request.view.view_url_suffix, format = %request.format)
    )]
    pub async fn export(&self, request: &ExportRequest) -> Result<PathBuf, ExportError> {
        let view_url = ViewUrl::new(request);
        let display_url = view_url.display_url();
        let policy = RetryPolicy::with_max_attempts(request.view.max_attempts);
        debug!(url = %display_url, max_attempts = policy.max_attempts(), "export request built");

        let exporter = self;
        let (view_url_ref, display_ref) = (&view_url, display_url.as_str());
        let max_attempts = policy.max_attempts();

        run_with_attempts(&policy, ExportError::is_retryable, move |attempt| async move {
            let result = exporter.attempt(request, view_url_ref, display_ref).await;
            if let Err(e) = &result {
                error!(
                    url = %display_ref,
                    attempt,
                    max_attempts,
                    status = ?e.status(),
                    error = %e,
                    "export attempt failed"
                );
            }
            result
        })
        .await
        .map_err(|exhausted| ExportError::AttemptsExhausted {
            url: display_url.clone(),
            attempts: exhausted.attempts,
            last: Box::new(exhausted.last),
        })
    }

    async fn attempt(
        &self,
        request: &ExportRequest,
        view_url: &ViewUrl,
        display_url: &str,
    ) -> Result<PathBuf, ExportError> {
        let timeout = request.view.timeout;
        let tls = request.server.tls_policy();
        let client =
            build_client(&tls, timeout).map_err(|e| ExportError::client(display_url, &e))?;

        let ticket = TicketIssuer::with_client(client.clone(), &tls)
            .issue(&request.ticket_request(), self.ticket_attempts)
            .await
            .map_err(|source| ExportError::Ticket {
                url: display_url.to_string(),
                source,
            })?;

        let fetch_url = view_url.fetch_url(ticket);
        debug!(url = %display_url, "getting view data");

        let response = client
            .get(&fetch_url)
            .basic_auth(request.credential_username(), Some(""))
            .send()
            .await
            .map_err(|e| ExportError::from_reqwest(display_url, timeout, e))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(ExportError::http_status(display_url, status));
        }

        let worker_id = self.worker_id.clone().unwrap_or_else(current_worker_id);
        let filename = export_filename(
            self.clock.now(),
            &worker_id,
            view_url.base_path(),
            request.format,
        );
        let path = request.dest_dir.join(filename);
        info!(path = %path.display(), "attempting to write export");

        let bytes = write_response(response, request.format, &path, display_url, timeout).await?;
        info!(path = %path.display(), bytes, "export complete");
        Ok(path)
    }
}
