//! Source document loading.
//!
//! Plain-text formats only; anything else is an `UnsupportedFormat` error
//! raised before any chunking or index write happens.

use std::fs;
use std::path::Path;

use crate::core::errors::{RagError, Result};

const SUPPORTED_EXTENSIONS: [&str; 2] = ["txt", "md"];

/// Check a path's extension without touching the file. Used to reject a
/// whole ingest batch up front, so no partial index write can occur.
pub fn check_format(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    if SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(RagError::UnsupportedFormat(path.display().to_string()))
    }
}

pub fn load_text(path: &Path) -> Result<String> {
    check_format(path)?;
    Ok(fs::read_to_string(path)?)
}

/// Stable source identity for a document: its file stem.
pub fn source_id_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string())
}
