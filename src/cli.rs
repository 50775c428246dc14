//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use viz_export::DEFAULT_MAX_ATTEMPTS;
use viz_export::export::{DEFAULT_PNG_HEIGHT, DEFAULT_PNG_WIDTH, ExportFormat};

/// Default per-attempt timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Export a view from a visualization server using trusted authentication.
///
/// A trusted ticket is requested for the subscriber, exchanged for the view
/// in the requested format, and the result is written to the output
/// directory. The written path is printed on stdout.
#[derive(Parser, Debug)]
#[command(name = "viz-export")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to config.toml (defaults to $VIZ_EXPORT_CONFIG or the XDG config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Server host, overriding the config file
    #[arg(long)]
    pub server: Option<String>,

    /// Use HTTPS, overriding the config file
    #[arg(long, conflicts_with = "no_ssl")]
    pub ssl: bool,

    /// Use plain HTTP, overriding the config file
    #[arg(long)]
    pub no_ssl: bool,

    /// Site the view belongs to ("Default" or empty for the default site)
    #[arg(long, default_value = "")]
    pub site: String,

    /// Subscriber username the ticket is issued for
    #[arg(short, long)]
    pub username: String,

    /// Subscriber domain ("local" for local authentication)
    #[arg(short, long)]
    pub domain: Option<String>,

    /// View path, e.g. "Workbook/View?Region=West"
    #[arg(long)]
    pub view: String,

    /// Output format (csv, png, pdf, twb)
    #[arg(short, long, default_value_t = ExportFormat::Png)]
    pub format: ExportFormat,

    /// PNG width in pixels, unless the view sets :size
    #[arg(long, default_value_t = DEFAULT_PNG_WIDTH)]
    pub png_width: u32,

    /// PNG height in pixels, unless the view sets :size
    #[arg(long, default_value_t = DEFAULT_PNG_HEIGHT)]
    pub png_height: u32,

    /// Force the server to refresh cached data
    #[arg(long)]
    pub refresh: bool,

    /// Timeout for each attempt in seconds (1-3600)
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: u64,

    /// Total export attempts (1-10)
    #[arg(short, long, default_value_t = DEFAULT_MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub attempts: u32,

    /// Directory to write the export to (overrides [temp] dir)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Worker identifier embedded in the output filename
    #[arg(long)]
    pub worker_id: Option<String>,
}

impl Args {
    /// TLS override from `--ssl` / `--no-ssl`.
    #[must_use]
    pub fn tls_override(&self) -> Option<bool> {
        if self.ssl {
            Some(true)
        } else if self.no_ssl {
            Some(false)
        } else {
            None
        }
    }
}
