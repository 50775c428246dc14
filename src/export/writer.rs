//! Writing export responses to disk.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use super::error::ExportError;
use super::request::ExportFormat;

/// Replaces every `\r\n` with `\n`; all other bytes are kept as-is.
#[must_use]
pub fn normalize_line_endings(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if data[i] == b'\r' && data.get(i + 1) == Some(&b'\n') {
            out.push(b'\n');
            i += 2;
        } else {
            out.push(data[i]);
            i += 1;
        }
    }
    out
}

/// Writes `response` to `path` in the way `format` requires, returning the
/// number of bytes written.
///
/// # Errors
///
/// Returns [`ExportError`] for body read failures and file errors.
pub async fn write_response(
    response: reqwest::Response,
    format: ExportFormat,
    path: &Path,
    url: &str,
    timeout: Duration,
) -> Result<u64, ExportError> {
    match format {
        ExportFormat::Csv => write_csv(response, path, url, timeout).await,
        ExportFormat::Png | ExportFormat::Pdf | ExportFormat::Twb => {
            let mut file = File::create(path)
                .await
                .map_err(|e| ExportError::io(url, path, e))?;
            let result = stream_to_file(&mut file, response, path, url, timeout).await;
            if result.is_err() {
                debug!(path = %path.display(), "cleaning up partial file after error");
                let _ = tokio::fs::remove_file(path).await;
            }
            result
        }
    }
}

async fn write_csv(
    response: reqwest::Response,
    path: &Path,
    url: &str,
    timeout: Duration,
) -> Result<u64, ExportError> {
    let body = response
        .bytes()
        .await
        .map_err(|e| ExportError::from_reqwest(url, timeout, e))?;
    let normalized = normalize_line_endings(&body);
    tokio::fs::write(path, &normalized)
        .await
        .map_err(|e| ExportError::io(url, path, e))?;
    Ok(normalized.len() as u64)
}

/// Streams the body chunk by chunk, stopping at the first empty chunk.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    path: &Path,
    url: &str,
    timeout: Duration,
) -> Result<u64, ExportError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| ExportError::from_reqwest(url, timeout, e))?;
        if chunk.is_empty() {
            break;
        }

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| ExportError::io(url, path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| ExportError::io(url, path, e))?;

    Ok(bytes_written)
}
