//! JSON pretty-printing and append-only log writes.

use chainperm_core::{error::ListenerError, event::LogRecord};
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Reformat raw payload bytes as JSON text indented with two spaces.
///
/// The payload is re-encoded through `serde_json::Value`: object keys come out
/// sorted and float literals keep a fractional part (`1e2` becomes `100.0`).
pub fn format_json(data: &[u8]) -> Result<String, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_slice(data)?;
    serde_json::to_string_pretty(&value)
}

/// Append `record` to `path` as one JSON line, creating the file if needed.
///
/// The file is opened, written, flushed and closed within this call, so no
/// handle outlives it on either the success or the error path. The record is
/// encoded before the file is opened.
pub async fn append_record(path: &Path, record: &LogRecord) -> Result<(), ListenerError> {
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');

    let io_err = |source| ListenerError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut options = tokio::fs::OpenOptions::new();
    options.append(true).create(true);
    #[cfg(unix)]
    options.mode(0o644);

    let mut file = options.open(path).await.map_err(io_err)?;
    file.write_all(&line).await.map_err(io_err)?;
    file.flush().await.map_err(io_err)?;
    Ok(())
}
