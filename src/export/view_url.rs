//! View URL composition.
//!
//! The display URL (no ticket) is what gets logged and reported; the fetch
//! URL is the same string with `/trusted/{ticket}` inserted after the
//! authority.

use super::request::{ExportFormat, ExportRequest};
use crate::ticket::Ticket;

/// Parameter that overrides the rendered PNG size.
const SIZE_PARAMETER: &str = ":size=";

/// Components of an export URL, minus the ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewUrl {
    scheme: &'static str,
    server: String,
    site_segment: String,
    base_path: String,
    query: String,
    format_fragment: String,
    force_refresh: bool,
}

impl ViewUrl {
    /// Composes the URL for `request`.
    #[must_use]
    pub fn new(request: &ExportRequest) -> Self {
        let (base_path, query) = split_view_suffix(&request.view.view_url_suffix);
        let format_fragment = format_fragment(
            request.format,
            &query,
            request.view.png_width,
            request.view.png_height,
        );
        Self {
            scheme: request.server.tls_policy().scheme(),
            server: request.server.host.clone(),
            site_segment: site_segment(&request.view.site),
            base_path: base_path.to_string(),
            query,
            format_fragment,
            force_refresh: request.view.force_refresh,
        }
    }

    /// View path without query string, e.g. `Sales/Overview`.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// URL safe to log: no ticket.
    #[must_use]
    pub fn display_url(&self) -> String {
        format!("{}://{}{}", self.scheme, self.server, self.tail())
    }

    /// URL actually requested; consumes the ticket.
    #[must_use]
    pub fn fetch_url(&self, ticket: Ticket) -> String {
        format!(
            "{}://{}/trusted/{}{}",
            self.scheme,
            self.server,
            ticket.into_secret(),
            self.tail()
        )
    }

    fn tail(&self) -> String {
        let mut tail = format!(
            "{}/views/{}{}{}",
            self.site_segment, self.base_path, self.query, self.format_fragment
        );
        if self.force_refresh {
            tail.push_str("&:refresh=y");
        }
        tail
    }
}

/// Splits `workbook/view?a=b` into `("workbook/view", "?a=b")`.
///
/// Without a `?` the query is the bare `?`, so parameters can always be
/// appended with `&`.
#[must_use]
pub fn split_view_suffix(suffix: &str) -> (&str, String) {
    match suffix.split_once('?') {
        Some((base, query)) => (base, format!("?{query}")),
        None => (suffix, "?".to_string()),
    }
}

/// `&:format={fmt}`, plus `&:size={w},{h}` for PNG unless `query` already
/// sets a size.
#[must_use]
pub fn format_fragment(format: ExportFormat, query: &str, width: u32, height: u32) -> String {
    if format == ExportFormat::Png && !query.contains(SIZE_PARAMETER) {
        format!("&:format={format}&:size={width},{height}")
    } else {
        format!("&:format={format}")
    }
}

/// `/t/{site}` for a named site, empty for the default site.
#[must_use]
pub fn site_segment(site: &str) -> String {
    if site.is_empty() {
        String::new()
    } else {
        format!("/t/{site}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::export::request::{ServerSettings, ViewDescriptor};

    fn request(suffix: &str, format: ExportFormat) -> ExportRequest {
        let mut server = ServerSettings::new("viz.local");
        server.use_tls = false;
        let mut view = ViewDescriptor::new("alice", suffix);
        view.png_width = 800;
        view.png_height = 600;
        ExportRequest {
            server,
            view,
            format,
            dest_dir: PathBuf::from("/tmp"),
        }
    }

    #[test]
    fn test_split_without_query() {
        assert_eq!(split_view_suffix("Sales/Overview"), ("Sales/Overview", "?".to_string()));
    }

    #[test]
    fn test_split_with_query_keeps_parameters() {
        assert_eq!(
            split_view_suffix("Sales/Overview?Region=West&Year=2024"),
            ("Sales/Overview", "?Region=West&Year=2024".to_string())
        );
    }

    #[test]
    fn test_split_only_at_first_question_mark() {
        assert_eq!(
            split_view_suffix("Sales/Overview?q=a?b"),
            ("Sales/Overview", "?q=a?b".to_string())
        );
    }

    #[test]
    fn test_png_adds_size_directive() {
        assert_eq!(
            format_fragment(ExportFormat::Png, "?", 800, 600),
            "&:format=png&:size=800,600"
        );
    }

    #[test]
    fn test_png_respects_existing_size_override() {
        let fragment = format_fragment(ExportFormat::Png, "?:size=300,200", 800, 600);
        assert_eq!(fragment, "&:format=png");
    }

    #[test]
    fn test_non_png_never_adds_size() {
        assert_eq!(format_fragment(ExportFormat::Csv, "?", 800, 600), "&:format=csv");
        assert_eq!(format_fragment(ExportFormat::Pdf, "?", 800, 600), "&:format=pdf");
    }

    #[test]
    fn test_site_segment() {
        assert_eq!(site_segment(""), "");
        assert_eq!(site_segment("finance"), "/t/finance");
    }

    #[test]
    fn test_display_url_default_site() {
        let url = ViewUrl::new(&request("Sales/Overview", ExportFormat::Png));
        assert_eq!(
            url.display_url(),
            "http://viz.local/views/Sales/Overview?&:format=png&:size=800,600"
        );
        assert!(!url.display_url().contains("/t/"));
    }

    #[test]
    fn test_display_url_named_site_has_single_segment() {
        let mut req = request("Sales/Overview?Region=West", ExportFormat::Csv);
        req.view.site = "finance".to_string();
        let display = ViewUrl::new(&req).display_url();
        assert_eq!(
            display,
            "http://viz.local/t/finance/views/Sales/Overview?Region=West&:format=csv"
        );
        assert_eq!(display.matches("/t/finance").count(), 1);
    }

    #[test]
    fn test_display_url_refresh_flag() {
        let mut req = request("Sales/Overview", ExportFormat::Pdf);
        req.view.force_refresh = true;
        assert!(ViewUrl::new(&req).display_url().ends_with("&:format=pdf&:refresh=y"));
    }

    #[test]
    fn test_display_url_https_scheme() {
        let mut req = request("Sales/Overview", ExportFormat::Pdf);
        req.server.use_tls = true;
        assert!(ViewUrl::new(&req).display_url().starts_with("https://viz.local/"));
    }

    #[test]
    fn test_fetch_url_inserts_ticket_before_site() {
        let mut req = request("Sales/Overview", ExportFormat::Csv);
        req.view.site = "finance".to_string();
        let url = ViewUrl::new(&req);
        let ticket = Ticket::parse("abc123").unwrap();
        assert_eq!(
            url.fetch_url(ticket),
            "http://viz.local/trusted/abc123/t/finance/views/Sales/Overview?&:format=csv"
        );
    }

    #[test]
    fn test_png_size_in_suffix_yields_single_size_directive() {
        let url = ViewUrl::new(&request(
            "Sales/Overview?:size=300,200",
            ExportFormat::Png,
        ));
        assert_eq!(url.display_url().matches(":size=").count(), 1);
    }
}
