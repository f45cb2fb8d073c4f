//! # Payload Assembler
//!
//! Reads a local file and combines it with the requested retention period
//! into the request envelope. Plain I/O glue; none of the RPC core's
//! concurrency machinery is needed here.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use nub_types::{RetentionPeriod, SnippetMessage};

/// Errors from assembling a snippet.
#[derive(Debug, Error)]
pub enum AssembleError {
    /// The payload file could not be opened or read.
    #[error("Failed to read {path}: {source}")]
    FileError {
        /// Path that could not be read.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Read the file at `path` and assemble it into a snippet expiring after
/// `retention`.
pub fn assemble(path: &Path, retention: RetentionPeriod) -> Result<SnippetMessage, AssembleError> {
    let text = fs::read_to_string(path).map_err(|source| AssembleError::FileError {
        path: path.display().to_string(),
        source,
    })?;

    Ok(SnippetMessage::new(text, extension_of(path), retention))
}

/// Derive the format tag: the text after the last `.` of the path string,
/// or the whole path when it has no dot.
fn extension_of(path: &Path) -> String {
    let raw = path.to_string_lossy();
    match raw.rfind('.') {
        Some(index) => raw[index + 1..].to_string(),
        None => raw.into_owned(),
    }
}
