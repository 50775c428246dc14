//! Output filenames for exported views.
//!
//! Query parameters are left out of the name (they may carry filter values),
//! so uniqueness comes from a microsecond timestamp plus a worker identifier.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Local, NaiveDateTime};

use super::request::ExportFormat;

/// Timestamp layout: `yyyyMMddHHmmss` followed by microseconds.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%6f";

/// Source of the timestamp embedded in filenames.
pub trait Clock: Send + Sync {
    /// Current local time.
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// `{timestamp}_{worker}_{view path with '/' as '-'}.{format}`.
#[must_use]
pub fn export_filename(
    timestamp: NaiveDateTime,
    worker_id: &str,
    view_path: &str,
    format: ExportFormat,
) -> String {
    format!(
        "{}_{}_{}.{}",
        timestamp.format(TIMESTAMP_FORMAT),
        worker_id,
        view_path.replace('/', "-"),
        format
    )
}

/// Process-wide counter distinguishing calls made on the same thread.
static WORKER_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Fresh worker identifier, safe to embed in a filename.
///
/// Built from the thread name, the numeric thread id and a process-wide
/// sequence number. Several exports can be polled on one runtime thread, so
/// the thread alone does not identify a caller; every call returns a new id.
#[must_use]
pub fn current_worker_id() -> String {
    let thread = std::thread::current();
    let id: String = format!("{:?}", thread.id())
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    let name = thread.name().unwrap_or("worker");
    let sequence = WORKER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    sanitize_worker_id(&format!("{name}-{id}-{sequence}"))
}

/// Replaces anything but alphanumerics, `-`, `_` and `.` with `-`.
#[must_use]
pub fn sanitize_worker_id(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "worker".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn fixed_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_micro_opt(9, 5, 2, 42)
            .unwrap()
    }

    #[test]
    fn test_export_filename_layout() {
        let name = export_filename(fixed_time(), "w1", "Sales/Overview", ExportFormat::Png);
        assert_eq!(name, "20240307090502000042_w1_Sales-Overview.png");
    }

    #[test]
    fn test_export_filename_replaces_every_slash() {
        let name = export_filename(fixed_time(), "w1", "a/b/c", ExportFormat::Csv);
        assert!(name.ends_with("_w1_a-b-c.csv"), "unexpected name: {name}");
        assert!(!name.contains('/'));
    }

    #[test]
    fn test_same_instant_different_workers_do_not_collide() {
        let a = export_filename(fixed_time(), "worker-1", "Sales/Overview", ExportFormat::Pdf);
        let b = export_filename(fixed_time(), "worker-2", "Sales/Overview", ExportFormat::Pdf);
        assert_ne!(a, b);
    }

    #[test]
    fn test_sanitize_worker_id() {
        assert_eq!(sanitize_worker_id("tokio runtime/worker"), "tokio-runtime-worker");
        assert_eq!(sanitize_worker_id(""), "worker");
    }

    #[test]
    fn test_current_worker_id_is_filename_safe() {
        let id = current_worker_id();
        assert!(!id.is_empty());
        assert!(
            id.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        );
    }

    #[test]
    fn test_current_worker_id_differs_between_calls_on_one_thread() {
        let first = current_worker_id();
        let second = current_worker_id();
        assert_ne!(first, second);
    }

    #[test]
    fn test_current_worker_id_differs_between_threads() {
        let here = current_worker_id();
        let there = std::thread::spawn(current_worker_id).join().unwrap();
        assert_ne!(here, there);
    }
}
