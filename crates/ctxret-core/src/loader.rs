//! Reading a source document into plain text.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};

/// Load the full text of a `.pdf`, `.txt` or `.md` document.
pub fn load_document(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(Error::NotFound(path.display().to_string()));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let text = match ext.as_str() {
        "pdf" => pdf_extract::extract_text(path).map_err(|e| {
            Error::UnsupportedFormat(format!("failed to extract text from {}: {}", path.display(), e))
        })?,
        "txt" | "md" => read_file_content(path)?,
        other => {
            return Err(Error::UnsupportedFormat(format!(
                "{} (extension '{}')",
                path.display(),
                other
            )))
        }
    };
    info!(path = %path.display(), chars = text.chars().count(), "loaded document");
    Ok(text)
}

fn read_file_content(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(path)?).into_owned()),
    }
}
