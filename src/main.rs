//! CLI entry point for the viz-export tool.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{debug, info};
use viz_export::export::{normalize_domain, normalize_site_name};
use viz_export::{ExportRequest, FileConfig, ServerSettings, ViewDescriptor, ViewExporter};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let file_config = match &args.config {
        Some(path) => Some(
            FileConfig::load(path)
                .with_context(|| format!("Failed to load config file '{}'", path.display()))?,
        ),
        None => FileConfig::load_default().context("Failed to load default config file")?,
    };

    let request = build_request(&args, file_config.as_ref())?;
    info!(
        server = %request.server.host,
        view = %request.view.view_url_suffix,
        format = %request.format,
        "exporting view"
    );

    let worker_id = args
        .worker_id
        .clone()
        .unwrap_or_else(|| format!("pid{}", std::process::id()));
    let exporter = ViewExporter::new().with_worker_id(&worker_id);

    let path = exporter.export(&request).await?;
    println!("{}", path.display());
    Ok(())
}

/// Merges CLI flags over the config file into one export request.
fn build_request(args: &Args, file_config: Option<&FileConfig>) -> Result<ExportRequest> {
    let mut server = match (&args.server, file_config.and_then(FileConfig::server_settings)) {
        (Some(host), Some(mut from_file)) => {
            from_file.host.clone_from(host);
            from_file
        }
        (Some(host), None) => {
            let mut settings = ServerSettings::new(host.as_str());
            settings.use_tls = false;
            settings
        }
        (None, Some(from_file)) => from_file,
        (None, None) => {
            bail!("No server configured. Pass --server or set [server] host in config.toml")
        }
    };
    if let Some(use_tls) = args.tls_override() {
        server.use_tls = use_tls;
    }

    let dest_dir = args
        .output_dir
        .clone()
        .or_else(|| file_config.and_then(|c| c.temp.dir.clone()))
        .unwrap_or_else(std::env::temp_dir);
    if !dest_dir.is_dir() {
        std::fs::create_dir_all(&dest_dir).with_context(|| {
            format!("Failed to create output directory '{}'", dest_dir.display())
        })?;
    }

    let mut view = ViewDescriptor::new(args.username.as_str(), args.view.as_str());
    view.site = normalize_site_name(&args.site);
    view.domain = args.domain.as_deref().and_then(normalize_domain);
    view.png_width = args.png_width;
    view.png_height = args.png_height;
    view.force_refresh = args.refresh;
    view.timeout = Duration::from_secs(args.timeout);
    view.max_attempts = args.attempts;

    Ok(ExportRequest {
        server,
        view,
        format: args.format,
        dest_dir,
    })
}
