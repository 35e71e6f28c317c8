//! File read/write tools.

use std::path::Path;

use crate::error::{Result, RunnerError};

/// Read a file's contents as UTF-8 text.
pub async fn read_file(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|error| RunnerError::tool("read_file", format!("{}: {error}", path.display())))
}

/// Write content to a file, truncating any existing contents.
///
/// The parent directory must already exist. Returns a confirmation string
/// for the model.
pub async fn write_file(path: &Path, content: &str) -> Result<String> {
    tokio::fs::write(path, content)
        .await
        .map_err(|error| RunnerError::tool("write_file", format!("{}: {error}", path.display())))?;
    Ok(format!("Successfully wrote to file: {}", path.display()))
}
