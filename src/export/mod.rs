//! View export through trusted tickets.
//!
//! An export turns a [`ViewDescriptor`] into one file on disk:
//!
//! 1. compose the view URL (site segment, caller query, `:format`, `:size`,
//!    `:refresh`);
//! 2. per attempt, obtain a fresh ticket from `/trusted`;
//! 3. GET `/trusted/{ticket}/...` with the subscriber as credential;
//! 4. write the body to `{timestamp}_{worker}_{view}.{format}`.
//!
//! Attempts repeat immediately until one succeeds or the descriptor's
//! attempt budget is spent.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use viz_export::export::{
//!     ExportFormat, ExportRequest, ServerSettings, ViewDescriptor, ViewExporter,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let request = ExportRequest {
//!     server: ServerSettings::new("viz.example.com"),
//!     view: ViewDescriptor::new("alice", "Sales/Overview?Region=West"),
//!     format: ExportFormat::Png,
//!     dest_dir: PathBuf::from("/var/tmp/viz-export"),
//! };
//! let path = ViewExporter::new().export(&request).await?;
//! println!("Exported to: {}", path.display());
//! # Ok(())
//! # }
//! ```

mod error;
mod exporter;
pub mod filename;
mod request;
pub mod view_url;
mod writer;

pub use error::ExportError;
pub use exporter::{DEFAULT_TICKET_ATTEMPTS, ViewExporter};
pub use filename::{Clock, SystemClock, export_filename};
pub use request::{
    DEFAULT_PNG_HEIGHT, DEFAULT_PNG_WIDTH, DEFAULT_TIMEOUT, ExportFormat, ExportRequest,
    ServerSettings, UnknownFormat, ViewDescriptor, normalize_domain, normalize_site_name,
};
pub use view_url::ViewUrl;
pub use writer::normalize_line_endings;
